//! Terminal output.

use serde::Serialize;

use phonestore_storefront::error::AppError;

/// Print `value` as pretty JSON on stdout.
#[allow(clippy::print_stdout)]
pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let rendered =
        serde_json::to_string_pretty(value).map_err(|e| AppError::Internal(e.to_string()))?;
    println!("{rendered}");
    Ok(())
}

#[allow(clippy::print_stdout)]
pub fn line(message: &str) {
    println!("{message}");
}

#[allow(clippy::print_stderr)]
pub fn error(message: &str) {
    eprintln!("error: {message}");
}
