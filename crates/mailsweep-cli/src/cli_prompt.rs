use mailsweep_core::Result;

/// Reads the password from the terminal without echo.
pub(crate) fn prompt_password(username: &str) -> Result<String> {
    let password = rpassword::prompt_password(prompt_text(username))?;
    Ok(password)
}

fn prompt_text(username: &str) -> String {
    format!("Enter password for {}: ", username)
}

#[cfg(test)]
mod tests {
    use super::prompt_text;

    #[test]
    fn prompt_names_the_account() {
        assert_eq!(
            prompt_text("me@example.com"),
            "Enter password for me@example.com: "
        );
    }
}
