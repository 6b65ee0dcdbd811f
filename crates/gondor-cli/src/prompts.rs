//! Interactive prompts.
//!
//! Uses dialoguer for terminal input.

use anyhow::Result;
use console::style;
use dialoguer::{Input, Password, theme::ColorfulTheme};

use gondor_core::commands::{
    SuperuserParams, validate_email, validate_password, validate_username,
};

/// Exact answer that confirms an instance deletion.
const DELETE_CONFIRMATION: &str = "Y";

pub struct Prompter {
    theme: ColorfulTheme,
}

impl Prompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    /// Ask for the account created by `run <label> createsuperuser`.
    pub fn superuser(&self) -> Result<SuperuserParams> {
        let username: String = Input::with_theme(&self.theme)
            .with_prompt("Username")
            .validate_with(|input: &String| validate_username(input))
            .interact_text()?;

        let email: String = Input::with_theme(&self.theme)
            .with_prompt("Email address")
            .validate_with(|input: &String| validate_email(input))
            .interact_text()?;

        let password = loop {
            let password = Password::with_theme(&self.theme)
                .with_prompt("Password")
                .allow_empty_password(true)
                .interact()?;
            let confirmation = Password::with_theme(&self.theme)
                .with_prompt("Password (again)")
                .allow_empty_password(true)
                .interact()?;
            match validate_password(&password, &confirmation) {
                Ok(()) => break password,
                Err(message) => eprintln!("{} {}", style("Error:").red(), message),
            }
        };

        Ok(SuperuserParams {
            username,
            email,
            password,
        })
    }

    /// True only when the user types exactly `Y`.
    pub fn confirm_delete(&self) -> Result<bool> {
        let answer: String = Input::new()
            .with_prompt("ARE YOU SURE YOU WANT TO DELETE THIS INSTANCE? [Y/N]")
            .allow_empty(true)
            .interact_text()?;
        Ok(is_delete_confirmed(&answer))
    }
}

fn is_delete_confirmed(answer: &str) -> bool {
    answer == DELETE_CONFIRMATION
}

#[cfg(test)]
mod tests {
    use super::is_delete_confirmed;

    #[test]
    fn only_uppercase_y_confirms() {
        assert!(is_delete_confirmed("Y"));
        assert!(!is_delete_confirmed("y"));
        assert!(!is_delete_confirmed("yes"));
        assert!(!is_delete_confirmed(""));
        assert!(!is_delete_confirmed(" Y"));
    }
}
