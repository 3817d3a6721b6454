//! Configuration injector: build and apply per-instance user-data.
//!
//! Members are configured one at a time, in batch order. Payload builder
//! failures (missing credential, unknown shard) are fatal; attribute update
//! failures follow the [`ApplyFailurePolicy`].

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::application::ports::{AttributeWriter, PayloadBuilder, ProgressReporter};
use crate::domain::enablement::{ApplyFailurePolicy, ConfigureStatus, MemberReport};
use crate::domain::error::EnableError;
use crate::domain::instance::Instance;

/// Instance attribute that carries boot-time user-data.
pub const USER_DATA_ATTRIBUTE: &str = "instance[user_data]";

/// Lowercase hex SHA-256 of a payload. Logged in place of the payload.
#[must_use]
pub fn payload_digest(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Build the payload for one stopped instance and write it.
///
/// # Errors
///
/// Returns an error if the payload cannot be built. Attribute update
/// failures are reported as [`ConfigureStatus::Failed`], not as errors.
pub async fn configure_instance(
    writer: &impl AttributeWriter,
    builder: &impl PayloadBuilder,
    instance: &Instance,
    template_ref: &str,
    auth_ref: &str,
) -> Result<ConfigureStatus> {
    let display_name = instance.display_name();
    let payload = builder
        .build_payload(template_ref, display_name, auth_ref)
        .await
        .with_context(|| format!("cannot build user-data for {display_name}"))?;
    let digest = payload_digest(&payload);
    tracing::debug!(
        instance = %instance.resource_uid,
        payload_sha256 = %digest,
        payload_len = payload.len(),
        "applying user-data"
    );

    let status = match writer
        .update_instance_attribute(
            &instance.cloud,
            &instance.resource_uid,
            USER_DATA_ATTRIBUTE,
            &payload,
        )
        .await
    {
        Ok(response) if response.is_success() => ConfigureStatus::Applied {
            payload_sha256: digest,
        },
        Ok(response) => ConfigureStatus::Failed {
            reason: format!("HTTP {}: {}", response.status, response.body.trim()),
        },
        Err(e) => ConfigureStatus::Failed {
            reason: format!("{e:#}"),
        },
    };
    Ok(status)
}

/// Configure every stopped member, sequentially.
///
/// # Errors
///
/// Returns an error if a payload cannot be built, or
/// [`EnableError::ApplyFailed`] on the first apply failure when `policy` is
/// [`ApplyFailurePolicy::Abort`].
pub async fn configure_batch(
    writer: &impl AttributeWriter,
    builder: &impl PayloadBuilder,
    reporter: &impl ProgressReporter,
    stopped: &[Instance],
    template_ref: &str,
    auth_ref: &str,
    policy: ApplyFailurePolicy,
) -> Result<Vec<MemberReport>> {
    let mut members = Vec::with_capacity(stopped.len());
    for instance in stopped {
        let display_name = instance.display_name().to_string();
        reporter.step(&format!("configuring {display_name}..."));
        let configure =
            configure_instance(writer, builder, instance, template_ref, auth_ref).await?;

        if let ConfigureStatus::Failed { reason } = &configure {
            tracing::warn!(
                instance = %instance.resource_uid,
                %reason,
                %policy,
                "user-data apply failed"
            );
            if policy == ApplyFailurePolicy::Abort {
                return Err(EnableError::ApplyFailed {
                    instance: display_name,
                    reason: reason.clone(),
                }
                .into());
            }
            reporter.warn(&format!(
                "{display_name}: user-data not applied ({reason}); it will restart unconfigured"
            ));
        }

        members.push(MemberReport {
            resource_uid: instance.resource_uid.clone(),
            display_name,
            configure,
        });
    }
    Ok(members)
}
