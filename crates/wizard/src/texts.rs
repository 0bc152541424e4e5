//! Operator-facing wording of the product wizard.

pub const NAME_PROMPT: &str = "Enter the product name";
pub const DESCRIPTION_PROMPT: &str = "Enter a product description";
pub const CATEGORY_PROMPT: &str = "Select a category";
pub const PRICE_PROMPT: &str = "Now enter the price of the product.";
pub const IMAGE_PROMPT: &str = "Upload a product image";

pub const NAME_REPROMPT: &str = "Please re-enter the name:";
pub const DESCRIPTION_REPROMPT: &str = "Please re-enter the description:";
pub const CATEGORY_REPROMPT: &str = "Please select the category again:";
pub const PRICE_REPROMPT: &str = "Please re-enter the price:";
pub const IMAGE_REPROMPT: &str = "Please upload the image again:";

pub const BACK_PREFIX: &str = "Ok, you're back to the last step";
pub const NO_PREVIOUS_STEP: &str =
    "There is no previous step. Enter the product name or write \"cancel\"";
pub const CANCELLED: &str = "Action cancelled";
pub const ADDED: &str = "Product added";
pub const MODIFIED: &str = "Product modified";
pub const ALREADY_ACTIVE: &str = "Finish or cancel the current product first.";
pub const KEEP_BUTTON: &str = "Keep current";

/// Callback data of the "keep current value" button.
pub const KEEP_CALLBACK: &str = "keep";

/// The hint appended to prompts during an edit.
pub fn keep_hint(token: &str, current: &str) -> String {
    format!("Send \"{token}\" to keep the current value: {current}")
}

/// The text shown when the catalog refuses or fails an operation.
pub fn store_failure(reason: &str) -> String {
    format!("Error: \n{reason}")
}

pub fn product_missing(id: i64) -> String {
    format!("Product {id} no longer exists.")
}
