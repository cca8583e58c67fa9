//! End-to-end transpiler scenarios on recorded scripts.

use pomforge::transpiler::{transpile, StepStyle, TranspileOptions};

const CHECKOUT: &str = r#"import { test, expect } from '@playwright/test';

test('checkout', async ({ page }) => {
  await page.goto('https://www.shop.test/');
  await page.getByRole('link', { name: 'Vehículos' }).click();
  await page.locator('#results').getByRole('button', { name: 'Add to cart' }).nth(1).click();
  await page.getByRole('textbox', { name: 'Coupon' }).fill('SAVE10');
  await page.getByRole('textbox', { name: 'Coupon' }).press('Enter');
  await page.waitForTimeout(500);
  await page.getByText('Checkout').click();
});
"#;

#[test]
fn test_feature_steps_follow_action_order() {
    let out = transpile(CHECKOUT, &TranspileOptions::default());

    let expected = "@Regression
Feature: Shop page

    Scenario: The user replays the recorded actions
        Given the user navigates to the Shop page
        When the user clicks the link \"Vehículos\"
        When the user clicks the button \"Add to cart\" (match 1) inside \"#results\"
        When the user enters \"SAVE10\" in the \"Coupon\" field
        When the user presses \"Enter\" in the \"Coupon\" field
        Then the user clicks the element \"text=Checkout\"
";
    assert_eq!(out.feature_source, expected);
    assert_eq!(out.unsupported.len(), 1);
    assert_eq!(out.unsupported[0].line_no, 9);
}

#[test]
fn test_and_style() {
    let opts = TranspileOptions {
        step_style: StepStyle::And,
        ..TranspileOptions::default()
    };
    let out = transpile(CHECKOUT, &opts);
    let keywords: Vec<&str> = out
        .feature_source
        .lines()
        .skip(4)
        .filter_map(|l| l.split_whitespace().next())
        .collect();
    assert_eq!(keywords, vec!["Given", "When", "And", "And", "And", "Then"]);
    // `And` steps are registered as `When` handlers.
    assert!(!out.steps_source.contains("And("));
}

#[test]
fn test_locators_are_unique_and_shared() {
    let out = transpile(CHECKOUT, &TranspileOptions::default());
    let names: Vec<&str> = out.locators.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "vehCulosLinkElement",
            "resultsContainer",
            "addToCartButtonElement",
            "couponInput",
            "checkoutLocator",
        ]
    );
    assert!(out
        .steps_source
        .contains("page.getByRole('textbox', { name: couponInput }).nth(0).press('Enter')"));
    assert!(out.steps_source.contains(
        "page.locator(resultsContainer).nth(0).getByRole('button', { name: addToCartButtonElement }).nth(1).click()"
    ));
    assert!(out.steps_source.contains("for (const page of this.pages) {"));
    assert!(out.steps_source.contains("await pause(STEP_DELAY_MS);"));
}

#[test]
fn test_empty_script() {
    let out = transpile("// nothing recorded\n", &TranspileOptions::default());
    assert!(out.actions.is_empty());
    assert!(out.feature_source.contains("Feature: Example page"));
    assert!(out.locators_source.starts_with("// Locators for page: Example\n"));
}
