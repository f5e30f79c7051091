//! The DID Document data model.
//!
//! Documents are decoded field by field from a JSON object so that the
//! set-shaped fields (`@context`, `controller`, the verification
//! relationships) can be read in any of their permitted encodings, and are
//! encoded back into the canonical shape where singleton sets collapse to
//! scalars and empty fields are omitted.
//!
//! See <https://www.w3.org/TR/did-core/#data-model>

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use serde::de::{self, DeserializeOwned};
use serde::{ser, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::did::Did;
use crate::error::Error;
use crate::shape::{expand_map, flatten_fields, flatten_map, take_expanded, take_expanded_strings};

/// Document fields written as a bare value when they hold a single element
const DOCUMENT_SET_FIELDS: &[&str] = &["@context", "controller"];

/// Service fields written as a bare value when they hold a single element
const SERVICE_SET_FIELDS: &[&str] = &["type"];

fn is_empty<T>(items: &&[T]) -> bool {
    items.is_empty()
}

/// Serializes `repr`, collapses the named set fields, and hands the result to `serializer`
fn serialize_flattened<T, S>(repr: T, fields: &[&str], serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    let mut value = serde_json::to_value(repr).map_err(ser::Error::custom)?;
    if let Value::Object(object) = &mut value {
        flatten_fields(object, fields);
    }
    value.serialize(serializer)
}

fn into_object(field: &str, value: Value) -> Result<Map<String, Value>, Error> {
    match value {
        Value::Object(object) => Ok(object),
        other => Err(Error::invalid_field(
            field,
            format!("expected a JSON object, found {}", other),
        )),
    }
}

/// Removes and decodes an optional field; `null` reads as absent.
fn take_field<T: DeserializeOwned>(
    object: &mut Map<String, Value>,
    field: &str,
) -> Result<Option<T>, Error> {
    match object.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| Error::invalid_field(field, e)),
    }
}

fn take_required<T: DeserializeOwned>(
    object: &mut Map<String, Value>,
    field: &str,
) -> Result<T, Error> {
    take_field(object, field)?.ok_or_else(|| Error::MissingField(field.to_string()))
}

/// A DID Document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub context: Vec<String>,
    pub id: Did,
    pub also_known_as: Vec<String>,
    pub controller: Vec<Did>,
    pub verification_method: VerificationMethods,

    // Verification relationships
    pub authentication: Vec<VerificationReference>,
    pub assertion_method: Vec<VerificationReference>,
    pub key_agreement: Vec<VerificationReference>,
    pub capability_invocation: Vec<VerificationReference>,
    pub capability_delegation: Vec<VerificationReference>,

    pub service: Vec<Service>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRepr<'a> {
    #[serde(rename = "@context", skip_serializing_if = "is_empty")]
    context: &'a [String],
    id: &'a Did,
    #[serde(skip_serializing_if = "is_empty")]
    also_known_as: &'a [String],
    #[serde(skip_serializing_if = "is_empty")]
    controller: &'a [Did],
    #[serde(skip_serializing_if = "is_empty")]
    verification_method: &'a [VerificationMethod],
    #[serde(skip_serializing_if = "is_empty")]
    authentication: &'a [VerificationReference],
    #[serde(skip_serializing_if = "is_empty")]
    assertion_method: &'a [VerificationReference],
    #[serde(skip_serializing_if = "is_empty")]
    key_agreement: &'a [VerificationReference],
    #[serde(skip_serializing_if = "is_empty")]
    capability_invocation: &'a [VerificationReference],
    #[serde(skip_serializing_if = "is_empty")]
    capability_delegation: &'a [VerificationReference],
    #[serde(skip_serializing_if = "is_empty")]
    service: &'a [Service],
}

impl Document {
    /// Creates a document holding nothing but its subject
    pub fn new(id: Did) -> Self {
        Self {
            context: Vec::new(),
            id,
            also_known_as: Vec::new(),
            controller: Vec::new(),
            verification_method: VerificationMethods::default(),
            authentication: Vec::new(),
            assertion_method: Vec::new(),
            key_agreement: Vec::new(),
            capability_invocation: Vec::new(),
            capability_delegation: Vec::new(),
            service: Vec::new(),
        }
    }

    /// Parses a JSON-encoded DID Document
    pub fn parse(raw: &[u8]) -> Result<Self, Error> {
        let value: Value = serde_json::from_slice(raw)?;
        Self::from_value(value)
    }

    /// Decodes a DID Document from a JSON value
    ///
    /// Unknown members are ignored.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        let mut object = into_object("document", value)?;

        let id = match object.remove("id") {
            Some(value) => serde_json::from_value(value).map_err(|e| Error::invalid_field("id", e))?,
            None => return Err(Error::MissingField("id".to_string())),
        };

        let controller = take_expanded(&mut object, "controller", false)?
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(|e| Error::invalid_field("controller", e)))
            .collect::<Result<Vec<Did>, Error>>()?;

        let mut relationship = |field: &str| -> Result<Vec<VerificationReference>, Error> {
            take_expanded(&mut object, field, false)?
                .into_iter()
                .map(|value| VerificationReference::from_value(field, value))
                .collect()
        };
        let authentication = relationship("authentication")?;
        let assertion_method = relationship("assertionMethod")?;
        let key_agreement = relationship("keyAgreement")?;
        let capability_invocation = relationship("capabilityInvocation")?;
        let capability_delegation = relationship("capabilityDelegation")?;

        Ok(Self {
            context: take_expanded_strings(&mut object, "@context", false)?,
            id,
            also_known_as: take_field(&mut object, "alsoKnownAs")?.unwrap_or_default(),
            controller,
            verification_method: take_field(&mut object, "verificationMethod")?.unwrap_or_default(),
            authentication,
            assertion_method,
            key_agreement,
            capability_invocation,
            capability_delegation,
            service: take_field(&mut object, "service")?.unwrap_or_default(),
        })
    }

    /// Encodes the document into its canonical JSON form
    pub fn to_json_vec(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Encodes the document into its canonical JSON form as a value
    pub fn to_value(&self) -> Result<Value, Error> {
        Ok(serde_json::to_value(self)?)
    }

    /// Resolves a verification reference against this document's verification methods
    ///
    /// A relative reference (`#fragment`) also matches the method whose id is
    /// the document's DID followed by that fragment.
    pub fn verification_method<'a>(
        &'a self,
        reference: &'a VerificationReference,
    ) -> Option<&'a VerificationMethod> {
        reference.resolve(&self.verification_method).or_else(|| match reference {
            VerificationReference::Reference(url) if url.starts_with('#') => {
                self.verification_method.get(&format!("{}{}", self.id.did(), url))
            }
            _ => None,
        })
    }

    fn repr(&self) -> DocumentRepr<'_> {
        DocumentRepr {
            context: &self.context,
            id: &self.id,
            also_known_as: &self.also_known_as,
            controller: &self.controller,
            verification_method: &self.verification_method,
            authentication: &self.authentication,
            assertion_method: &self.assertion_method,
            key_agreement: &self.key_agreement,
            capability_invocation: &self.capability_invocation,
            capability_delegation: &self.capability_delegation,
            service: &self.service,
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_flattened(self.repr(), DOCUMENT_SET_FIELDS, serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(de::Error::custom)
    }
}

impl FromStr for Document {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.as_bytes())
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pretty = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        f.write_str(&pretty)
    }
}

/// Public key material of a verification method
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PublicKey {
    #[serde(rename = "publicKeyJwk")]
    Jwk(Map<String, Value>),
    #[serde(rename = "publicKeyMultibase")]
    Multibase(String),
}

/// A verification method
///
/// Carries at most one form of public key material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawVerificationMethod")]
pub struct VerificationMethod {
    pub id: String,
    pub controller: String,
    #[serde(rename = "type")]
    pub method_type: String,
    #[serde(flatten)]
    pub public_key: Option<PublicKey>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVerificationMethod {
    id: String,
    controller: String,
    #[serde(rename = "type")]
    method_type: String,
    public_key_jwk: Option<Map<String, Value>>,
    public_key_multibase: Option<String>,
}

impl TryFrom<RawVerificationMethod> for VerificationMethod {
    type Error = Error;

    fn try_from(raw: RawVerificationMethod) -> Result<Self, Self::Error> {
        let public_key = match (raw.public_key_jwk, raw.public_key_multibase) {
            (Some(_), Some(_)) => {
                return Err(Error::invalid_field(
                    "verificationMethod",
                    format!("{} has both publicKeyJwk and publicKeyMultibase", raw.id),
                ))
            }
            (Some(jwk), None) => Some(PublicKey::Jwk(jwk)),
            (None, Some(multibase)) => Some(PublicKey::Multibase(multibase)),
            (None, None) => None,
        };

        Ok(Self {
            id: raw.id,
            controller: raw.controller,
            method_type: raw.method_type,
            public_key,
        })
    }
}

/// The `verificationMethod` list of a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationMethods(Vec<VerificationMethod>);

impl VerificationMethods {
    /// Returns the first method with the given id
    pub fn get(&self, id: &str) -> Option<&VerificationMethod> {
        self.0.iter().find(|method| method.id == id)
    }

    pub fn push(&mut self, method: VerificationMethod) {
        self.0.push(method);
    }
}

impl Deref for VerificationMethods {
    type Target = [VerificationMethod];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<VerificationMethod>> for VerificationMethods {
    fn from(methods: Vec<VerificationMethod>) -> Self {
        Self(methods)
    }
}

impl FromIterator<VerificationMethod> for VerificationMethods {
    fn from_iter<I: IntoIterator<Item = VerificationMethod>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// An entry of a verification relationship: an embedded method or a URL pointing at one
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VerificationReference {
    Embedded(VerificationMethod),
    Reference(String),
}

impl VerificationReference {
    /// Decodes a relationship entry, trying an embedded method before a URL string
    fn from_value(field: &str, value: Value) -> Result<Self, Error> {
        match serde_json::from_value::<VerificationMethod>(value.clone()) {
            Ok(method) => Ok(Self::Embedded(method)),
            Err(embedded_err) => match value {
                Value::String(url) => Ok(Self::Reference(url)),
                _ => Err(Error::invalid_field(field, embedded_err)),
            },
        }
    }

    /// Returns the method this entry designates
    ///
    /// An embedded method is returned as is; a URL is matched by exact id
    /// equality against `methods`, first match wins.
    pub fn resolve<'a>(&'a self, methods: &'a [VerificationMethod]) -> Option<&'a VerificationMethod> {
        match self {
            Self::Embedded(method) => Some(method),
            Self::Reference(url) => methods.iter().find(|method| method.id == *url),
        }
    }
}

impl<'de> Deserialize<'de> for VerificationReference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value("verificationReference", value).map_err(de::Error::custom)
    }
}

/// A service endpoint descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub id: String,
    pub service_type: Vec<String>,
    /// Endpoint URIs map to the empty string; named endpoints map to their URI
    pub service_endpoint: BTreeMap<String, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceRepr<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    service_type: &'a [String],
    service_endpoint: Value,
}

impl Service {
    /// Creates a service with a single type and a single endpoint URI
    pub fn new(id: impl Into<String>, service_type: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            service_type: vec![service_type.into()],
            service_endpoint: BTreeMap::from([(endpoint.into(), String::new())]),
        }
    }

    /// Decodes a service from a JSON value
    pub fn from_value(value: Value) -> Result<Self, Error> {
        let mut object = into_object("service", value)?;

        let id = take_required(&mut object, "id")?;
        let service_type = take_expanded_strings(&mut object, "type", true)?;
        let endpoint = object
            .remove("serviceEndpoint")
            .ok_or_else(|| Error::MissingField("serviceEndpoint".to_string()))?;

        Ok(Self {
            id,
            service_type,
            service_endpoint: expand_map("serviceEndpoint", endpoint)?,
        })
    }
}

impl Serialize for Service {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = ServiceRepr {
            id: &self.id,
            service_type: &self.service_type,
            service_endpoint: flatten_map(&self.service_endpoint),
        };
        serialize_flattened(repr, SERVICE_SET_FIELDS, serializer)
    }
}

impl<'de> Deserialize<'de> for Service {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(de::Error::custom)
    }
}
