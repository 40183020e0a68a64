//! `StorageProvider` backed by the AWS SDK for Rust

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketCannedAcl, BucketLocationConstraint, CreateBucketConfiguration, Delete, ErrorDocument,
    IndexDocument, ObjectCannedAcl, ObjectIdentifier, ObjectOwnership, Tag, Tagging,
    WebsiteConfiguration,
};
use chrono::{DateTime, Utc};
use sandbox_cloud::{
    BucketSummary, CannedAcl, ObjectFailure, ObjectPage, Result, SandboxError, StorageProvider,
    TagSet, WebsiteConfig,
};
use tracing::{debug, info};

/// Region used when neither the command line nor the AWS profile names one
pub const DEFAULT_REGION: &str = "us-east-1";

/// Regions whose website endpoint uses `s3-website-<region>`
const DASH_WEBSITE_REGIONS: &[&str] = &[
    "us-east-1",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
    "sa-east-1",
    "us-gov-west-1",
];

/// S3 implementation of [`StorageProvider`]
pub struct S3Provider {
    client: S3Client,
    region: String,
}

impl S3Provider {
    /// Create a provider from the default credential chain
    ///
    /// `region` overrides whatever the environment or profile configures.
    pub async fn from_env(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let sdk_config = loader.load().await;

        let region = sdk_config
            .region()
            .map(|r| r.as_ref().to_string())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        // Requests and website URLs must agree on the region
        let config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .region(Region::new(region.clone()))
            .build();

        debug!(region = %region, "S3 client ready");
        Self::from_client(S3Client::from_conf(config), region)
    }

    /// Wrap an existing client
    pub fn from_client(client: S3Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }

    async fn open_public_access(&self, bucket: &str) -> Result<()> {
        self.client
            .delete_public_access_block()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| transport("DeletePublicAccessBlock", e))?;

        self.client
            .put_bucket_acl()
            .bucket(bucket)
            .acl(BucketCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| transport("PutBucketAcl", e))?;
        Ok(())
    }
}

/// Website endpoint host for `region`
pub fn website_host(region: &str) -> String {
    if DASH_WEBSITE_REGIONS.contains(&region) {
        format!("s3-website-{}.amazonaws.com", region)
    } else {
        format!("s3-website.{}.amazonaws.com", region)
    }
}

fn transport<E: std::error::Error>(operation: &str, err: E) -> SandboxError {
    SandboxError::transport(operation, DisplayErrorContext(err))
}

fn to_chrono(date: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(date.secs(), date.subsec_nanos())
}

#[async_trait]
impl StorageProvider for S3Provider {
    fn name(&self) -> &str {
        "aws"
    }

    fn region(&self) -> &str {
        &self.region
    }

    fn website_host(&self) -> String {
        website_host(&self.region)
    }

    async fn head_bucket(&self, bucket: &str) -> Result<()> {
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| transport("HeadBucket", e))?;
        Ok(())
    }

    async fn create_bucket(&self, bucket: &str, acl: CannedAcl) -> Result<()> {
        let mut request = self
            .client
            .create_bucket()
            .bucket(bucket)
            .object_ownership(ObjectOwnership::ObjectWriter);

        if self.region != DEFAULT_REGION {
            let location = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build();
            request = request.create_bucket_configuration(location);
        }

        match request.send().await {
            Ok(_) => info!(bucket = %bucket, "Bucket created"),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_bucket_already_owned_by_you() {
                    debug!(bucket = %bucket, "Bucket already owned");
                } else {
                    return Err(transport("CreateBucket", service_err));
                }
            }
        }

        // New buckets block public ACLs and policies until this is lifted
        match acl {
            CannedAcl::PublicRead => self.open_public_access(bucket).await,
            CannedAcl::Private => Ok(()),
        }
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<()> {
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await
            .map_err(|e| transport("PutBucketPolicy", e))?;
        Ok(())
    }

    async fn put_bucket_website(&self, bucket: &str, website: &WebsiteConfig) -> Result<()> {
        let index = IndexDocument::builder()
            .suffix(&website.index_document)
            .build()
            .map_err(|e| transport("PutBucketWebsite", e))?;
        let error = ErrorDocument::builder()
            .key(&website.error_document)
            .build()
            .map_err(|e| transport("PutBucketWebsite", e))?;
        let configuration = WebsiteConfiguration::builder()
            .index_document(index)
            .error_document(error)
            .build();

        self.client
            .put_bucket_website()
            .bucket(bucket)
            .website_configuration(configuration)
            .send()
            .await
            .map_err(|e| transport("PutBucketWebsite", e))?;
        Ok(())
    }

    async fn put_bucket_tags(&self, bucket: &str, tags: &TagSet) -> Result<()> {
        let tag_set = tags
            .iter()
            .map(|(key, value)| Tag::builder().key(key).value(value).build())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| transport("PutBucketTagging", e))?;
        let tagging = Tagging::builder()
            .set_tag_set(Some(tag_set))
            .build()
            .map_err(|e| transport("PutBucketTagging", e))?;

        self.client
            .put_bucket_tagging()
            .bucket(bucket)
            .tagging(tagging)
            .send()
            .await
            .map_err(|e| transport("PutBucketTagging", e))?;
        Ok(())
    }

    async fn delete_bucket_website(&self, bucket: &str) -> Result<()> {
        self.client
            .delete_bucket_website()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| transport("DeleteBucketWebsite", e))?;
        Ok(())
    }

    async fn delete_bucket_policy(&self, bucket: &str) -> Result<()> {
        self.client
            .delete_bucket_policy()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| transport("DeleteBucketPolicy", e))?;
        Ok(())
    }

    async fn delete_bucket_tags(&self, bucket: &str) -> Result<()> {
        self.client
            .delete_bucket_tagging()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| transport("DeleteBucketTagging", e))?;
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| transport("DeleteBucket", e))?;
        info!(bucket = %bucket, "Bucket deleted");
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<BucketSummary>> {
        let mut buckets = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let output = self
                .client
                .list_buckets()
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| transport("ListBuckets", e))?;

            buckets.extend(output.buckets().iter().filter_map(|bucket| {
                let name = bucket.name()?;
                Some(BucketSummary {
                    name: name.to_string(),
                    created_at: bucket.creation_date().and_then(to_chrono),
                })
            }));

            match output.continuation_token() {
                Some(token) if !token.is_empty() => continuation = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(count = buckets.len(), "Listed buckets");
        Ok(buckets)
    }

    async fn get_bucket_tags(&self, bucket: &str) -> Result<TagSet> {
        let output = self
            .client
            .get_bucket_tagging()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| transport("GetBucketTagging", e))?;

        Ok(output
            .tag_set()
            .iter()
            .map(|tag| (tag.key().to_string(), tag.value().to_string()))
            .collect())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ObjectPage> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .set_prefix((!prefix.is_empty()).then(|| prefix.to_string()))
            .set_continuation_token(continuation)
            .send()
            .await
            .map_err(|e| transport("ListObjectsV2", e))?;

        let keys = output
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect();
        let next = if output.is_truncated().unwrap_or(false) {
            output.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ObjectPage { keys, next })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        source: &Path,
        acl: CannedAcl,
    ) -> Result<()> {
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| transport("PutObject", e))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .acl(ObjectCannedAcl::from(acl.as_str()))
            .content_type(crate::content_type::for_path(source))
            .send()
            .await
            .map_err(|e| transport("PutObject", e))?;
        Ok(())
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<Vec<ObjectFailure>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| transport("DeleteObjects", e))?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| transport("DeleteObjects", e))?;

        let output = self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| transport("DeleteObjects", e))?;

        Ok(output
            .errors()
            .iter()
            .map(|error| ObjectFailure {
                key: error.key().unwrap_or_default().to_string(),
                message: error
                    .message()
                    .or(error.code())
                    .unwrap_or("unknown error")
                    .to_string(),
            })
            .collect())
    }
}
