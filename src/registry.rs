//! Group registry client
//!
//! Document-store CRUD for masjid broadcast groups and listener profiles.
//! The streaming core consumes only the live/offline flag per group and
//! supplies priority lists for persistence; everything else here is plumbing
//! around the document wire format.

use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashSet;

use crate::config::RegistryConfig;
use crate::constants::HTTP_TIMEOUT;
use crate::error::RegistryError;
use crate::priority::GroupPriority;

/// One broadcast group as stored in the registry
#[derive(Debug, Clone)]
pub struct GroupRecord {
    pub group_id: String,
    pub name: String,
    pub broadcaster_id: String,
    pub is_live: bool,
}

/// A listener profile as stored in the registry
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub user_id: String,
    pub email: String,
    pub joined_groups: Vec<String>,
    pub priorities: Vec<GroupPriority>,
}

/// Client for the group registry
pub struct RegistryClient {
    project_id: String,
    http: reqwest::Client,
    base_url: String,
}

impl RegistryClient {
    /// Build a client; fails when no project identifier is configured
    pub fn new(config: &RegistryConfig) -> Result<Self, RegistryError> {
        if config.project_id.is_empty() {
            return Err(RegistryError::MissingProjectId);
        }

        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()?;
        let base_url = format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents",
            config.project_id
        );

        Ok(Self {
            project_id: config.project_id.clone(),
            http,
            base_url,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Create a broadcast group document
    pub async fn create_group(
        &self,
        token: &str,
        group_id: &str,
        name: &str,
        broadcaster_id: &str,
    ) -> Result<GroupRecord, RegistryError> {
        let payload = json!({
            "fields": {
                "masjid_id": { "stringValue": group_id },
                "masjid_name": { "stringValue": name },
                "maulvi_id": { "stringValue": broadcaster_id },
                "is_live": { "booleanValue": false },
            }
        });
        let url = format!("{}/masjid?documentId={}", self.base_url, group_id);

        let doc = self.post(&url, token, &payload).await?;
        decode_group(&doc)
    }

    /// List all broadcast groups with their live/offline flags
    pub async fn list_groups(&self, token: &str) -> Result<Vec<GroupRecord>, RegistryError> {
        let url = format!("{}/masjid", self.base_url);
        let body = self.get(&url, token).await?;

        body.get("documents")
            .and_then(|d| d.as_array())
            .map(|docs| docs.iter().map(decode_group).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    /// The ids of all currently live groups
    pub async fn live_group_ids(&self, token: &str) -> Result<HashSet<String>, RegistryError> {
        Ok(self
            .list_groups(token)
            .await?
            .into_iter()
            .filter(|g| g.is_live)
            .map(|g| g.group_id)
            .collect())
    }

    /// Flip a group's live flag and record a timestamped status document
    pub async fn set_group_live(
        &self,
        token: &str,
        group_id: &str,
        is_live: bool,
    ) -> Result<(), RegistryError> {
        let url = format!(
            "{}/masjid/{}?updateMask.fieldPaths=is_live",
            self.base_url, group_id
        );
        let payload = json!({
            "fields": { "is_live": { "booleanValue": is_live } }
        });
        self.patch(&url, token, &payload).await?;

        let status_url = format!("{}/stream/{}", self.base_url, group_id);
        let status_payload = json!({
            "fields": {
                "masjid_id": { "stringValue": group_id },
                "is_live": { "booleanValue": is_live },
                "timestamp": { "timestampValue": Utc::now().to_rfc3339() },
            }
        });
        self.patch(&status_url, token, &status_payload).await?;
        Ok(())
    }

    /// Fetch a listener profile; absent profiles come back empty
    pub async fn get_user(&self, token: &str, user_id: &str) -> Result<UserProfile, RegistryError> {
        let url = format!("{}/users/{}", self.base_url, user_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await?;

        if response.status().as_u16() == 404 {
            return Ok(UserProfile {
                user_id: user_id.to_string(),
                ..Default::default()
            });
        }
        let doc = Self::check(response).await?;
        decode_user(&doc)
    }

    /// Add a group to a listener's joined set
    pub async fn join_group(
        &self,
        token: &str,
        user_id: &str,
        group_id: &str,
    ) -> Result<UserProfile, RegistryError> {
        let mut profile = self.get_user(token, user_id).await?;
        if !profile.joined_groups.iter().any(|g| g == group_id) {
            profile.joined_groups.push(group_id.to_string());
            profile.joined_groups.sort();
        }

        let url = format!(
            "{}/users/{}?updateMask.fieldPaths=user_id&updateMask.fieldPaths=email&updateMask.fieldPaths=joined_masjid&updateMask.fieldPaths=priority_list",
            self.base_url, user_id
        );
        let payload = json!({
            "fields": {
                "user_id": { "stringValue": user_id },
                "email": { "stringValue": profile.email },
                "joined_masjid": { "arrayValue": { "values":
                    profile.joined_groups.iter()
                        .map(|g| json!({ "stringValue": g }))
                        .collect::<Vec<_>>()
                } },
                "priority_list": encode_priorities(&profile.priorities),
            }
        });

        let doc = self.patch(&url, token, &payload).await?;
        decode_user(&doc)
    }

    /// Persist a listener's priority list
    pub async fn update_user_priorities(
        &self,
        token: &str,
        user_id: &str,
        priorities: &[GroupPriority],
    ) -> Result<(), RegistryError> {
        let url = format!(
            "{}/users/{}?updateMask.fieldPaths=priority_list",
            self.base_url, user_id
        );
        let payload = json!({
            "fields": { "priority_list": encode_priorities(priorities) }
        });
        self.patch(&url, token, &payload).await?;
        Ok(())
    }

    async fn get(&self, url: &str, token: &str) -> Result<Value, RegistryError> {
        let response = self.http.get(url).bearer_auth(token).send().await?;
        Self::check(response).await
    }

    async fn post(&self, url: &str, token: &str, payload: &Value) -> Result<Value, RegistryError> {
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;
        Self::check(response).await
    }

    async fn patch(&self, url: &str, token: &str, payload: &Value) -> Result<Value, RegistryError> {
        let response = self
            .http
            .patch(url)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;
        Self::check(response).await
    }

    async fn check(response: reqwest::Response) -> Result<Value, RegistryError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

// ---------------------------------------------------------------------------
// Document wire format
// ---------------------------------------------------------------------------

/// Decode a typed document value into a plain JSON value
fn decode_value(value: &Value) -> Value {
    if let Some(s) = value.get("stringValue") {
        return s.clone();
    }
    if let Some(b) = value.get("booleanValue") {
        return b.clone();
    }
    if let Some(i) = value.get("integerValue") {
        // Integers arrive as strings on the wire
        return match i {
            Value::String(s) => s.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
            other => other.clone(),
        };
    }
    if let Some(t) = value.get("timestampValue") {
        return t.clone();
    }
    if let Some(a) = value.get("arrayValue") {
        let values = a
            .get("values")
            .and_then(|v| v.as_array())
            .map(|vs| vs.iter().map(decode_value).collect())
            .unwrap_or_default();
        return Value::Array(values);
    }
    if let Some(m) = value.get("mapValue") {
        let fields = m
            .get("fields")
            .and_then(|f| f.as_object())
            .map(|fs| {
                fs.iter()
                    .map(|(k, v)| (k.clone(), decode_value(v)))
                    .collect()
            })
            .unwrap_or_default();
        return Value::Object(fields);
    }
    Value::Null
}

/// Decode a document's fields into a flat JSON object
fn decode_document(doc: &Value) -> Value {
    let fields = doc
        .get("fields")
        .and_then(|f| f.as_object())
        .map(|fs| {
            fs.iter()
                .map(|(k, v)| (k.clone(), decode_value(v)))
                .collect()
        })
        .unwrap_or_default();
    Value::Object(fields)
}

fn decode_group(doc: &Value) -> Result<GroupRecord, RegistryError> {
    let flat = decode_document(doc);
    let get_str = |key: &str| {
        flat.get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    let group_id = get_str("masjid_id");
    if group_id.is_empty() {
        return Err(RegistryError::Malformed(
            "group document without masjid_id".to_string(),
        ));
    }

    Ok(GroupRecord {
        group_id,
        name: get_str("masjid_name"),
        broadcaster_id: get_str("maulvi_id"),
        is_live: flat.get("is_live").and_then(|v| v.as_bool()).unwrap_or(false),
    })
}

fn decode_user(doc: &Value) -> Result<UserProfile, RegistryError> {
    let flat = decode_document(doc);

    let joined_groups = flat
        .get("joined_masjid")
        .and_then(|v| v.as_array())
        .map(|vs| {
            vs.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();

    let priorities = flat
        .get("priority_list")
        .and_then(|v| v.as_array())
        .map(|vs| vs.iter().filter_map(decode_priority).collect())
        .unwrap_or_default();

    Ok(UserProfile {
        user_id: flat
            .get("user_id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        email: flat
            .get("email")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        joined_groups,
        priorities,
    })
}

fn decode_priority(item: &Value) -> Option<GroupPriority> {
    Some(GroupPriority {
        priority: item.get("priority")?.as_i64()? as i32,
        group_id: item.get("masjid_id")?.as_str()?.to_string(),
        enabled: item.get("enabled").and_then(|v| v.as_bool()).unwrap_or(true),
    })
}

/// Encode a priority list as a typed array value
fn encode_priorities(priorities: &[GroupPriority]) -> Value {
    let values: Vec<Value> = priorities
        .iter()
        .map(|p| {
            json!({
                "mapValue": {
                    "fields": {
                        "masjid_id": { "stringValue": p.group_id },
                        "priority": { "integerValue": p.priority.to_string() },
                        "enabled": { "booleanValue": p.enabled },
                    }
                }
            })
        })
        .collect();
    json!({ "arrayValue": { "values": values } })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_project_id_is_a_construction_error() {
        let result = RegistryClient::new(&RegistryConfig::default());
        assert!(matches!(result, Err(RegistryError::MissingProjectId)));
    }

    #[test]
    fn decodes_group_document() {
        let doc = json!({
            "name": "projects/p/databases/(default)/documents/masjid/alnoor",
            "fields": {
                "masjid_id": { "stringValue": "alnoor" },
                "masjid_name": { "stringValue": "Al-Noor" },
                "maulvi_id": { "stringValue": "user-1" },
                "is_live": { "booleanValue": true },
            }
        });

        let group = decode_group(&doc).unwrap();
        assert_eq!(group.group_id, "alnoor");
        assert_eq!(group.name, "Al-Noor");
        assert!(group.is_live);
    }

    #[test]
    fn group_without_id_is_malformed() {
        let doc = json!({ "fields": { "masjid_name": { "stringValue": "x" } } });
        assert!(matches!(
            decode_group(&doc),
            Err(RegistryError::Malformed(_))
        ));
    }

    #[test]
    fn decodes_user_with_priorities() {
        let doc = json!({
            "fields": {
                "user_id": { "stringValue": "user-1" },
                "email": { "stringValue": "u@example.org" },
                "joined_masjid": { "arrayValue": { "values": [
                    { "stringValue": "alnoor" },
                    { "stringValue": "central" },
                ] } },
                "priority_list": { "arrayValue": { "values": [
                    { "mapValue": { "fields": {
                        "masjid_id": { "stringValue": "alnoor" },
                        "priority": { "integerValue": "1" },
                        "enabled": { "booleanValue": true },
                    } } },
                    { "mapValue": { "fields": {
                        "masjid_id": { "stringValue": "central" },
                        "priority": { "integerValue": "2" },
                        "enabled": { "booleanValue": false },
                    } } },
                ] } },
            }
        });

        let profile = decode_user(&doc).unwrap();
        assert_eq!(profile.user_id, "user-1");
        assert_eq!(profile.joined_groups, vec!["alnoor", "central"]);
        assert_eq!(profile.priorities.len(), 2);
        assert_eq!(profile.priorities[0].group_id, "alnoor");
        assert_eq!(profile.priorities[0].priority, 1);
        assert!(!profile.priorities[1].enabled);
    }

    #[test]
    fn priority_round_trip_through_wire_format() {
        let priorities = vec![
            GroupPriority {
                priority: 1,
                group_id: "alnoor".into(),
                enabled: true,
            },
            GroupPriority {
                priority: 3,
                group_id: "central".into(),
                enabled: false,
            },
        ];

        let encoded = encode_priorities(&priorities);
        let decoded: Vec<GroupPriority> = encoded
            .get("arrayValue")
            .and_then(|a| a.get("values"))
            .and_then(|v| v.as_array())
            .unwrap()
            .iter()
            .map(decode_value)
            .filter_map(|v| decode_priority(&v))
            .collect();

        assert_eq!(decoded, priorities);
    }
}
