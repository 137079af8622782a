use serde::Serialize;

pub const UNKNOWN: &str = "Unknown";

/// Capability roles advertised by an entity. Both may be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Roles {
    pub sp: bool,
    pub idp: bool,
}

impl Roles {
    pub fn is_empty(&self) -> bool {
        !self.sp && !self.idp
    }

    /// "SP", "IdP", "SP+IdP", or "Unknown" when neither role is present.
    pub fn label(&self) -> String {
        if self.is_empty() {
            return UNKNOWN.to_string();
        }
        let mut names = Vec::new();
        if self.sp {
            names.push("SP");
        }
        if self.idp {
            names.push("IdP");
        }
        names.join("+")
    }
}

/// Normalized view of one `EntityDescriptor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityRecord {
    /// Empty when the descriptor carries no usable `entityID`.
    pub entity_id: String,
    pub roles: Roles,
    pub org_name: String,
    /// Raw `registrationAuthority`, empty when absent.
    pub registration_authority: String,
    pub federation_name: String,
    pub has_privacy: bool,
    pub privacy_url: Option<String>,
    pub has_security: bool,
    pub has_sirtfi: bool,
}

impl Default for EntityRecord {
    fn default() -> Self {
        Self {
            entity_id: String::new(),
            roles: Roles::default(),
            org_name: UNKNOWN.to_string(),
            registration_authority: String::new(),
            federation_name: UNKNOWN.to_string(),
            has_privacy: false,
            privacy_url: None,
            has_security: false,
            has_sirtfi: false,
        }
    }
}

impl EntityRecord {
    pub fn has_identifier(&self) -> bool {
        !self.entity_id.is_empty()
    }

    pub fn has_registration_authority(&self) -> bool {
        !self.registration_authority.is_empty()
    }

    /// Privacy URL of an SP entity. Non-SP entities never contribute URLs
    /// to validation.
    pub fn sp_privacy_url(&self) -> Option<&str> {
        if self.roles.sp && self.has_privacy {
            self.privacy_url.as_deref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_labels() {
        assert_eq!(Roles { sp: true, idp: false }.label(), "SP");
        assert_eq!(Roles { sp: false, idp: true }.label(), "IdP");
        assert_eq!(Roles { sp: true, idp: true }.label(), "SP+IdP");
        assert_eq!(Roles::default().label(), "Unknown");
    }

    #[test]
    fn idp_privacy_url_is_not_exposed_for_validation() {
        let record = EntityRecord {
            entity_id: "https://idp.example.org".to_string(),
            roles: Roles { sp: false, idp: true },
            has_privacy: true,
            privacy_url: Some("https://idp.example.org/privacy".to_string()),
            ..Default::default()
        };
        assert_eq!(record.sp_privacy_url(), None);
    }
}
