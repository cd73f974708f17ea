//! XML request/response bodies for the S3 wire protocol.
//!
//! Field names are `PascalCase` via `#[serde(rename = ...)]` to match the
//! S3 XML schema; values are serialized with `quick_xml::se::to_string`
//! and deserialized with `quick_xml::de::from_str`.

use chrono::{DateTime, Utc};
use objectio_common::{Acl, CorsRule, LifecycleRule, Permission, Tag};
use objectio_meta_store::types::{StoredBucket, StoredMultipartUpload, StoredObject, StoredPart};
use serde::{Deserialize, Serialize};

pub fn timestamp_to_iso(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
        .unwrap_or_else(|| "1970-01-01T00:00:00.000Z".to_string())
}

pub fn xml_prolog(body: &str) -> String {
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}")
}

// ---- Service / ListBuckets -------------------------------------------

#[derive(Serialize)]
#[serde(rename = "ListAllMyBucketsResult")]
pub struct ListBucketsResult {
    #[serde(rename = "Owner")]
    pub owner: Owner,
    #[serde(rename = "Buckets")]
    pub buckets: Buckets,
}

#[derive(Serialize)]
pub struct Owner {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "DisplayName")]
    pub display_name: String,
}

#[derive(Serialize)]
pub struct Buckets {
    #[serde(rename = "Bucket")]
    pub bucket: Vec<Bucket>,
}

#[derive(Serialize)]
pub struct Bucket {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "CreationDate")]
    pub creation_date: String,
}

impl From<&StoredBucket> for Bucket {
    fn from(b: &StoredBucket) -> Self {
        Self { name: b.name.clone(), creation_date: timestamp_to_iso(b.created_at) }
    }
}

// ---- ListBucket (ListObjects) ------------------------------------------

#[derive(Serialize)]
#[serde(rename = "ListBucketResult")]
pub struct ListBucketResult {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Prefix")]
    pub prefix: String,
    #[serde(rename = "Delimiter", skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(rename = "MaxKeys")]
    pub max_keys: u32,
    #[serde(rename = "IsTruncated")]
    pub is_truncated: bool,
    #[serde(rename = "NextContinuationToken", skip_serializing_if = "Option::is_none")]
    pub next_continuation_token: Option<String>,
    #[serde(rename = "CommonPrefixes", skip_serializing_if = "Vec::is_empty")]
    pub common_prefixes: Vec<CommonPrefix>,
    #[serde(rename = "Contents", skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<ObjectContent>,
}

#[derive(Serialize)]
pub struct CommonPrefix {
    #[serde(rename = "Prefix")]
    pub prefix: String,
}

#[derive(Serialize)]
pub struct ObjectContent {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "LastModified")]
    pub last_modified: String,
    #[serde(rename = "ETag")]
    pub etag: String,
    #[serde(rename = "Size")]
    pub size: u64,
    #[serde(rename = "StorageClass")]
    pub storage_class: String,
}

impl From<&StoredObject> for ObjectContent {
    fn from(o: &StoredObject) -> Self {
        Self {
            key: o.key.clone(),
            last_modified: timestamp_to_iso(o.last_modified),
            etag: o.etag.clone(),
            size: o.size,
            storage_class: "STANDARD".to_string(),
        }
    }
}

// ---- CopyObject ----------------------------------------------------------

#[derive(Serialize)]
#[serde(rename = "CopyObjectResult")]
pub struct CopyObjectResult {
    #[serde(rename = "ETag")]
    pub etag: String,
    #[serde(rename = "LastModified")]
    pub last_modified: String,
}

// ---- Multipart ------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename = "InitiateMultipartUploadResult")]
pub struct InitiateMultipartUploadResult {
    #[serde(rename = "Bucket")]
    pub bucket: String,
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "UploadId")]
    pub upload_id: String,
}

#[derive(Serialize)]
#[serde(rename = "CompleteMultipartUploadResult")]
pub struct CompleteMultipartUploadResult {
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Bucket")]
    pub bucket: String,
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "ETag")]
    pub etag: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "CompleteMultipartUpload")]
pub struct CompleteMultipartUploadXml {
    #[serde(rename = "Part", default)]
    pub part: Vec<CompletePart>,
}

#[derive(Debug, Deserialize)]
pub struct CompletePart {
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    #[serde(rename = "ETag")]
    pub etag: String,
}

#[derive(Serialize)]
#[serde(rename = "ListPartsResult")]
pub struct ListPartsResult {
    #[serde(rename = "Bucket")]
    pub bucket: String,
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "UploadId")]
    pub upload_id: String,
    #[serde(rename = "IsTruncated")]
    pub is_truncated: bool,
    #[serde(rename = "Part", skip_serializing_if = "Vec::is_empty")]
    pub part: Vec<PartItem>,
}

#[derive(Serialize)]
pub struct PartItem {
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    #[serde(rename = "LastModified")]
    pub last_modified: String,
    #[serde(rename = "ETag")]
    pub etag: String,
    #[serde(rename = "Size")]
    pub size: u64,
}

impl From<&StoredPart> for PartItem {
    fn from(p: &StoredPart) -> Self {
        Self {
            part_number: p.part_number,
            last_modified: timestamp_to_iso(p.last_modified),
            etag: p.etag.clone(),
            size: p.size,
        }
    }
}

#[derive(Serialize)]
#[serde(rename = "ListMultipartUploadsResult")]
pub struct ListMultipartUploadsResult {
    #[serde(rename = "Bucket")]
    pub bucket: String,
    #[serde(rename = "IsTruncated")]
    pub is_truncated: bool,
    #[serde(rename = "Upload", skip_serializing_if = "Vec::is_empty")]
    pub upload: Vec<UploadItem>,
}

#[derive(Serialize)]
pub struct UploadItem {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "UploadId")]
    pub upload_id: String,
    #[serde(rename = "Initiated")]
    pub initiated: String,
    #[serde(rename = "StorageClass")]
    pub storage_class: String,
}

impl From<&StoredMultipartUpload> for UploadItem {
    fn from(u: &StoredMultipartUpload) -> Self {
        Self {
            key: u.key.clone(),
            upload_id: u.upload_id.clone(),
            initiated: timestamp_to_iso(u.created_at),
            storage_class: "STANDARD".to_string(),
        }
    }
}

// ---- DeleteObjects ---------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename = "Delete")]
pub struct DeleteObjectsRequest {
    #[serde(rename = "Quiet", default)]
    pub quiet: bool,
    #[serde(rename = "Object", default)]
    pub object: Vec<DeleteObjectIdentifier>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteObjectIdentifier {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "VersionId")]
    pub version_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename = "DeleteResult")]
pub struct DeleteObjectsResult {
    #[serde(rename = "Deleted", skip_serializing_if = "Vec::is_empty")]
    pub deleted: Vec<DeletedObject>,
    #[serde(rename = "Error", skip_serializing_if = "Vec::is_empty")]
    pub error: Vec<DeleteError>,
}

#[derive(Serialize)]
pub struct DeletedObject {
    #[serde(rename = "Key")]
    pub key: String,
}

#[derive(Serialize)]
pub struct DeleteError {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Message")]
    pub message: String,
}

// ---- Tagging ---------------------------------------------------------------

#[derive(Serialize, Deserialize)]
#[serde(rename = "Tagging")]
pub struct TaggingXml {
    #[serde(rename = "TagSet")]
    pub tag_set: TagSetXml,
}

#[derive(Serialize, Deserialize, Default)]
pub struct TagSetXml {
    #[serde(rename = "Tag", default)]
    pub tag: Vec<TagXml>,
}

#[derive(Serialize, Deserialize)]
pub struct TagXml {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl From<&Tag> for TagXml {
    fn from(t: &Tag) -> Self {
        Self { key: t.key.clone(), value: t.value.clone() }
    }
}

impl From<&TagXml> for Tag {
    fn from(t: &TagXml) -> Self {
        Self { key: t.key.clone(), value: t.value.clone() }
    }
}

pub fn tagging_xml(tags: &[Tag]) -> TaggingXml {
    TaggingXml {
        tag_set: TagSetXml { tag: tags.iter().map(TagXml::from).collect() },
    }
}

// ---- ACL -----------------------------------------------------------------

#[derive(Serialize, Deserialize)]
#[serde(rename = "AccessControlPolicy")]
pub struct AccessControlPolicyXml {
    #[serde(rename = "Owner")]
    pub owner: Owner,
    #[serde(rename = "AccessControlList")]
    pub access_control_list: AccessControlListXml,
}

#[derive(Serialize, Deserialize, Default)]
pub struct AccessControlListXml {
    #[serde(rename = "Grant", default)]
    pub grant: Vec<GrantXml>,
}

#[derive(Serialize, Deserialize)]
pub struct GrantXml {
    #[serde(rename = "Grantee")]
    pub grantee: GranteeXml,
    #[serde(rename = "Permission")]
    pub permission: String,
}

#[derive(Serialize, Deserialize)]
pub struct GranteeXml {
    #[serde(rename = "ID")]
    pub id: String,
}

fn permission_to_str(p: Permission) -> &'static str {
    match p {
        Permission::FullControl => "FULL_CONTROL",
        Permission::Read => "READ",
        Permission::Write => "WRITE",
        Permission::ReadAcp => "READ_ACP",
        Permission::WriteAcp => "WRITE_ACP",
    }
}

fn permission_from_str(s: &str) -> Permission {
    match s {
        "READ" => Permission::Read,
        "WRITE" => Permission::Write,
        "READ_ACP" => Permission::ReadAcp,
        "WRITE_ACP" => Permission::WriteAcp,
        _ => Permission::FullControl,
    }
}

pub fn acl_to_xml(acl: &Acl) -> AccessControlPolicyXml {
    AccessControlPolicyXml {
        owner: Owner { id: acl.owner.clone(), display_name: acl.owner.clone() },
        access_control_list: AccessControlListXml {
            grant: acl
                .grants
                .iter()
                .map(|g| GrantXml {
                    grantee: GranteeXml { id: g.grantee.clone() },
                    permission: permission_to_str(g.permission).to_string(),
                })
                .collect(),
        },
    }
}

pub fn acl_from_xml(xml: &AccessControlPolicyXml) -> Acl {
    Acl {
        owner: xml.owner.id.clone(),
        grants: xml
            .access_control_list
            .grant
            .iter()
            .map(|g| objectio_common::Grant {
                grantee: g.grantee.id.clone(),
                permission: permission_from_str(&g.permission),
            })
            .collect(),
    }
}

// ---- CORS ------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
#[serde(rename = "CORSConfiguration")]
pub struct CorsConfigurationXml {
    #[serde(rename = "CORSRule", default)]
    pub cors_rule: Vec<CorsRuleXml>,
}

#[derive(Serialize, Deserialize, Default)]
pub struct CorsRuleXml {
    #[serde(rename = "AllowedOrigin", default)]
    pub allowed_origin: Vec<String>,
    #[serde(rename = "AllowedMethod", default)]
    pub allowed_method: Vec<String>,
    #[serde(rename = "AllowedHeader", default)]
    pub allowed_header: Vec<String>,
    #[serde(rename = "MaxAgeSeconds")]
    pub max_age_seconds: Option<u32>,
}

impl From<&CorsRule> for CorsRuleXml {
    fn from(r: &CorsRule) -> Self {
        Self {
            allowed_origin: r.allowed_origins.clone(),
            allowed_method: r.allowed_methods.clone(),
            allowed_header: r.allowed_headers.clone(),
            max_age_seconds: r.max_age_seconds,
        }
    }
}

impl From<&CorsRuleXml> for CorsRule {
    fn from(r: &CorsRuleXml) -> Self {
        Self {
            allowed_origins: r.allowed_origin.clone(),
            allowed_methods: r.allowed_method.clone(),
            allowed_headers: r.allowed_header.clone(),
            max_age_seconds: r.max_age_seconds,
        }
    }
}

pub fn cors_to_xml(rules: &[CorsRule]) -> CorsConfigurationXml {
    CorsConfigurationXml { cors_rule: rules.iter().map(CorsRuleXml::from).collect() }
}

pub fn cors_from_xml(xml: &CorsConfigurationXml) -> Vec<CorsRule> {
    xml.cors_rule.iter().map(CorsRule::from).collect()
}

// ---- Lifecycle --------------------------------------------------------------

#[derive(Serialize, Deserialize)]
#[serde(rename = "LifecycleConfiguration")]
pub struct LifecycleConfigurationXml {
    #[serde(rename = "Rule", default)]
    pub rule: Vec<LifecycleRuleXml>,
}

#[derive(Serialize, Deserialize)]
pub struct LifecycleRuleXml {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Prefix")]
    pub prefix: String,
    #[serde(rename = "Expiration", skip_serializing_if = "Option::is_none")]
    pub expiration: Option<ExpirationXml>,
}

#[derive(Serialize, Deserialize)]
pub struct ExpirationXml {
    #[serde(rename = "Days")]
    pub days: u32,
}

impl From<&LifecycleRule> for LifecycleRuleXml {
    fn from(r: &LifecycleRule) -> Self {
        Self {
            id: r.id.clone(),
            prefix: r.prefix.clone(),
            expiration: r.expiration_days.map(|days| ExpirationXml { days }),
        }
    }
}

impl From<&LifecycleRuleXml> for LifecycleRule {
    fn from(r: &LifecycleRuleXml) -> Self {
        Self {
            id: r.id.clone(),
            prefix: r.prefix.clone(),
            expiration_days: r.expiration.as_ref().map(|e| e.days),
        }
    }
}

pub fn lifecycle_to_xml(rules: &[LifecycleRule]) -> LifecycleConfigurationXml {
    LifecycleConfigurationXml { rule: rules.iter().map(LifecycleRuleXml::from).collect() }
}

pub fn lifecycle_from_xml(xml: &LifecycleConfigurationXml) -> Vec<LifecycleRule> {
    xml.rule.iter().map(LifecycleRule::from).collect()
}

// ---- Versioning --------------------------------------------------------------

#[derive(Serialize, Deserialize, Default)]
#[serde(rename = "VersioningConfiguration")]
pub struct VersioningConfigurationXml {
    #[serde(rename = "Status")]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_to_iso_epoch() {
        assert_eq!(timestamp_to_iso(0), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_acl_roundtrip() {
        let acl = Acl::owner_full_control("tenant-a");
        let xml = acl_to_xml(&acl);
        let back = acl_from_xml(&xml);
        assert_eq!(back, acl);
    }

    #[test]
    fn test_cors_roundtrip() {
        let rules = vec![CorsRule {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec!["GET".to_string()],
            allowed_headers: vec![],
            max_age_seconds: Some(3600),
        }];
        let xml = cors_to_xml(&rules);
        assert_eq!(cors_from_xml(&xml), rules);
    }
}
