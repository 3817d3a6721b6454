//! Enablement user-data rendering and transport encoding.
//!
//! Pure functions only. The rendered document is a MIME multipart cloud-init
//! payload: a `cloud-config` part that makes `scripts-user` run on every boot,
//! and a shell part that pipes the enablement script into bash. Identical
//! inputs always render byte-identical output.

use anyhow::Result;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::domain::error::UserDataError;

/// Default location of the enablement script.
pub const DEFAULT_SCRIPT_URL: &str = "https://rightlink.rightscale.com/rll/10/rightlink.enable.sh";

/// Default cloud type passed to the enablement script.
pub const DEFAULT_CLOUD_TYPE: &str = "amazon";

/// Everything the enablement script needs to register an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDataSpec<'a> {
    pub refresh_token: &'a str,
    pub server_template: &'a str,
    pub server_name: &'a str,
    pub deployment_name: &'a str,
    pub cloud_type: &'a str,
    pub api_host: &'a str,
    pub script_url: &'a str,
}

impl UserDataSpec<'_> {
    /// Reject values that would escape the double-quoted script arguments.
    ///
    /// # Errors
    ///
    /// Returns [`UserDataError`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("refresh token", self.refresh_token),
            ("server template", self.server_template),
            ("server name", self.server_name),
            ("deployment name", self.deployment_name),
            ("cloud type", self.cloud_type),
            ("api host", self.api_host),
            ("script url", self.script_url),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(UserDataError::Empty { field }.into());
            }
            if value
                .chars()
                .any(|c| matches!(c, '"' | '`' | '$' | '\\' | '\n' | '\r'))
            {
                let shown = if field == "refresh token" {
                    "<redacted>".to_string()
                } else {
                    value.to_string()
                };
                return Err(UserDataError::UnsafeValue {
                    field,
                    value: shown,
                }
                .into());
            }
        }
        Ok(())
    }

    /// The one-line command that fetches and runs the enablement script.
    ///
    /// # Errors
    ///
    /// Returns an error if any field fails [`Self::validate`].
    pub fn command(&self) -> Result<String> {
        self.validate()?;
        // cloud-init runs user scripts as root; no sudo (it trips the tty check).
        Ok(format!(
            "curl -s {url} | bash -s -- -k \"{token}\" -t \"{template}\" -n \"{name}\" -d \"{deployment}\" -c \"{cloud}\" -a \"{host}\"",
            url = self.script_url,
            token = self.refresh_token,
            template = self.server_template,
            name = self.server_name,
            deployment = self.deployment_name,
            cloud = self.cloud_type,
            host = self.api_host,
        ))
    }

    /// Render the full multipart user-data document.
    ///
    /// # Errors
    ///
    /// Returns an error if any field fails [`Self::validate`].
    pub fn render(&self) -> Result<String> {
        let command = self.command()?;
        // The script part is named so it sorts first among per-boot scripts.
        Ok(format!(
            "Content-Type: multipart/mixed; boundary=\"//\"\n\
MIME-Version: 1.0\n\
\n\
--//\n\
Content-Type: text/cloud-config; charset=\"us-ascii\"\n\
MIME-Version: 1.0\n\
Content-Transfer-Encoding: 7bit\n\
Content-Disposition: attachment; filename=\"cloud-config.txt\"\n\
\n\
#cloud-config\n\
cloud_final_modules:\n\
- [scripts-user, always]\n\
\n\
--//\n\
Content-Type: text/x-shellscript; charset=\"us-ascii\"\n\
MIME-Version: 1.0\n\
Content-Transfer-Encoding: 7bit\n\
Content-Disposition: attachment; filename=\"aaa_rlenable.sh\"\n\
\n\
#!/bin/bash\n\
{command}\n\
--//"
        ))
    }

    /// Render and encode in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if any field fails [`Self::validate`].
    pub fn encoded(&self) -> Result<String> {
        Ok(encode_user_data(&self.render()?))
    }
}

/// Base64-encode user-data for use as an attribute value, without line
/// breaks and with `+`, `/` and `=` percent-escaped.
#[must_use]
pub fn encode_user_data(raw: &str) -> String {
    let b64: String = STANDARD
        .encode(raw.as_bytes())
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .collect();
    percent_escape(&b64)
}

/// Inverse of [`encode_user_data`].
///
/// # Errors
///
/// Returns an error if the value is not percent-escaped base64 of UTF-8 text.
pub fn decode_user_data(encoded: &str) -> Result<String> {
    let b64 = percent_unescape(encoded)?;
    let bytes = STANDARD.decode(b64)?;
    Ok(String::from_utf8(bytes)?)
}

/// Escape every byte outside `[A-Za-z0-9]` as `%XX`.
#[must_use]
pub fn percent_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn percent_unescape(value: &str) -> Result<Vec<u8>> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = value
                .get(i + 1..i + 3)
                .ok_or_else(|| anyhow::anyhow!("truncated escape at offset {i}"))?;
            out.push(u8::from_str_radix(hex, 16)?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}
