use std::collections::HashMap;

use crate::model::entity::{EntityRecord, Roles, UNKNOWN};
use crate::parsers::metadata_tree::{
    Element, NS_ICMD, NS_MD, NS_MDATTR, NS_MDRPI, NS_MDUI, NS_REMD, NS_SAML,
};

/// registrationAuthority → federation display name
pub type FederationMap = HashMap<String, String>;

pub const SIRTFI_URI: &str = "https://refeds.org/sirtfi";
const ASSURANCE_CERTIFICATION: &str = "urn:oasis:names:tc:SAML:attribute:assurance-certification";
const REFEDS_SECURITY: &str = "http://refeds.org/metadata/contactType/security";
const INCOMMON_SECURITY: &str = "http://id.incommon.org/metadata/contactType/security";

/// Lazy walk over every `EntityDescriptor` in a document, at any depth.
///
/// Entities without an `entityID` are yielded with an empty `entity_id`.
/// Use [`extract_entities`] to skip them.
pub struct Entities<'a> {
    stack: Vec<&'a Element>,
    federations: Option<&'a FederationMap>,
}

impl<'a> Iterator for Entities<'a> {
    type Item = EntityRecord;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(element) = self.stack.pop() {
            if element.is(NS_MD, "EntityDescriptor") {
                return Some(read_entity(element, self.federations));
            }
            self.stack.extend(element.children.iter().rev());
        }
        None
    }
}

pub fn scan_entities<'a>(root: &'a Element, federations: Option<&'a FederationMap>) -> Entities<'a> {
    Entities {
        stack: vec![root],
        federations,
    }
}

/// Identified entities only. Aggregation goes through [`scan_entities`]
/// because unidentified entities still count.
#[cfg_attr(not(test), allow(dead_code))]
pub fn extract_entities<'a>(
    root: &'a Element,
    federations: Option<&'a FederationMap>,
) -> impl Iterator<Item = EntityRecord> + 'a {
    scan_entities(root, federations).filter(|e| e.has_identifier())
}

fn read_entity(entity: &Element, federations: Option<&FederationMap>) -> EntityRecord {
    let entity_id = entity
        .attr("entityID")
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    let roles = Roles {
        sp: entity.find(NS_MD, "SPSSODescriptor").is_some(),
        idp: entity.find(NS_MD, "IDPSSODescriptor").is_some(),
    };

    let org_name = first_text(entity, NS_MD, "OrganizationDisplayName")
        .unwrap_or(UNKNOWN)
        .to_string();

    let privacy_url = first_text(entity, NS_MDUI, "PrivacyStatementURL").map(str::to_string);

    let registration_authority = entity
        .find(NS_MDRPI, "RegistrationInfo")
        .and_then(|r| r.attr("registrationAuthority"))
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    let federation_name = resolve_federation(&registration_authority, federations);

    EntityRecord {
        entity_id,
        roles,
        org_name,
        registration_authority,
        federation_name,
        has_privacy: privacy_url.is_some(),
        privacy_url,
        has_security: has_security_contact(entity),
        has_sirtfi: has_sirtfi(entity),
    }
}

/// First matching descendant with non-empty text.
fn first_text<'a>(entity: &'a Element, ns: &'a str, name: &'a str) -> Option<&'a str> {
    entity
        .find_all(ns, name)
        .map(|e| e.text.as_str())
        .find(|t| !t.is_empty())
}

fn has_security_contact(entity: &Element) -> bool {
    entity.find_all(NS_MD, "ContactPerson").any(|contact| {
        contact.attr_ns(NS_REMD, "contactType") == Some(REFEDS_SECURITY)
            || contact.attr_ns(NS_ICMD, "contactType") == Some(INCOMMON_SECURITY)
    })
}

fn has_sirtfi(entity: &Element) -> bool {
    entity
        .find_all(NS_MDATTR, "EntityAttributes")
        .flat_map(|attrs| attrs.children(NS_SAML, "Attribute"))
        .filter(|attr| attr.attr("Name") == Some(ASSURANCE_CERTIFICATION))
        .flat_map(|attr| attr.children(NS_SAML, "AttributeValue"))
        .any(|value| value.text == SIRTFI_URI)
}

pub fn resolve_federation(authority: &str, federations: Option<&FederationMap>) -> String {
    if authority.is_empty() {
        return UNKNOWN.to_string();
    }
    federations
        .and_then(|map| map.get(authority))
        .cloned()
        .unwrap_or_else(|| authority.to_string())
}
