// Session context passed explicitly to every mutation

use crate::error::{DocketError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    SuperAdmin,
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }

    /// Unknown or missing roles get the least privileged role
    pub fn parse(raw: &str) -> Role {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SUPER_ADMIN" => Role::SuperAdmin,
            "ADMIN" => Role::Admin,
            _ => Role::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub actor: String,
    pub role: Role,
}

impl Session {
    pub fn new(actor: impl Into<String>, role: Role) -> Self {
        Session {
            actor: actor.into(),
            role,
        }
    }

    pub fn anonymous() -> Self {
        Session::new("anonymous", Role::User)
    }

    /// Local operator of the CLI / terminal board
    pub fn operator() -> Self {
        let actor = std::env::var("USER").unwrap_or_else(|_| "operator".to_string());
        Session::new(actor, Role::SuperAdmin)
    }

    /// Dropdown management (document types) is reserved to super admins
    pub fn require_super_admin(&self, action: &str) -> Result<()> {
        if self.role == Role::SuperAdmin {
            Ok(())
        } else {
            Err(DocketError::Forbidden(format!(
                "{} requires SUPER_ADMIN, session role is {}",
                action,
                self.role.as_str()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("super_admin"), Role::SuperAdmin);
        assert_eq!(Role::parse("ADMIN"), Role::Admin);
        assert_eq!(Role::parse(""), Role::User);
        assert_eq!(Role::parse("intern"), Role::User);
    }

    #[test]
    fn test_super_admin_gate() {
        assert!(Session::new("root", Role::SuperAdmin)
            .require_super_admin("delete document type")
            .is_ok());

        let err = Session::new("clerk", Role::Admin)
            .require_super_admin("delete document type")
            .unwrap_err();
        assert!(matches!(err, DocketError::Forbidden(_)));
        assert!(err.to_string().contains("session role is ADMIN"));
    }
}
