use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Sign-up and sign-in are restricted to addresses under one email domain.
#[derive(Debug, Clone)]
pub struct EmailPolicy {
    suffix: String,
}

impl EmailPolicy {
    /// `domain` may be given with or without the leading `@`.
    pub fn new(domain: &str) -> Self {
        let domain = domain.trim().trim_start_matches('@').to_ascii_lowercase();
        Self {
            suffix: format!("@{domain}"),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn check(&self, email: &str) -> Result<(), ApiError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ApiError::Validation("Email is required".into()));
        }
        if !email.contains('@') {
            return Err(ApiError::Validation("Invalid email format".into()));
        }
        if !email.to_ascii_lowercase().ends_with(&self.suffix) {
            return Err(ApiError::Validation(format!(
                "Only {} email addresses are allowed",
                self.suffix
            )));
        }
        Ok(())
    }
}

pub fn check_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(result: Result<(), ApiError>) -> String {
        match result {
            Err(ApiError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn email_domain_rules() {
        let policy = EmailPolicy::new("@Example.com");
        assert_eq!(policy.suffix(), "@example.com");

        assert!(policy.check("ada@example.com").is_ok());
        assert!(policy.check("Ada@EXAMPLE.com").is_ok());
        assert_eq!(reason(policy.check("")), "Email is required");
        assert_eq!(reason(policy.check("ada.example.com")), "Invalid email format");
        assert_eq!(
            reason(policy.check("ada@elsewhere.org")),
            "Only @example.com email addresses are allowed"
        );
        // suffix must be the whole domain
        assert!(policy.check("ada@notexample.com").is_err());
    }

    #[test]
    fn password_length() {
        assert!(check_password("short").is_err());
        assert!(check_password("long enough").is_ok());
    }
}
