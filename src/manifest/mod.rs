/// Architecture placeholder substitution in manifests
use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;
use tracing::info;

/// Token replaced by the architecture name
pub const ARCH_PLACEHOLDER: &str = "$ARCH";

/// Image architecture as used in manifest image tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Amd64,
    Arm64,
}

impl Arch {
    /// Map a machine name (`uname -m`) to an image architecture
    pub fn from_machine(machine: &str) -> Result<Self> {
        match machine {
            "x86_64" => Ok(Arch::Amd64),
            "aarch64" => Ok(Arch::Arm64),
            other => anyhow::bail!("Unsupported machine architecture: {}", other),
        }
    }

    /// Architecture of the running machine
    pub fn detect() -> Result<Self> {
        Self::from_machine(std::env::consts::ARCH)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Arch {
    type Err = anyhow::Error;

    /// Accepts both image (`amd64`) and machine (`x86_64`) names
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "amd64" => Ok(Arch::Amd64),
            "arm64" => Ok(Arch::Arm64),
            other => Self::from_machine(other),
        }
    }
}

/// Replace every placeholder in `content`
pub fn substitute_arch(content: &str, arch: Arch) -> String {
    content.replace(ARCH_PLACEHOLDER, arch.as_str())
}

/// Rewrite a manifest in place for the running machine's architecture
pub async fn update_yaml_with_arch(manifest: &Path) -> Result<()> {
    update_yaml_with_arch_for(manifest, Arch::detect()?).await
}

pub async fn update_yaml_with_arch_for(manifest: &Path, arch: Arch) -> Result<()> {
    let content = tokio::fs::read_to_string(manifest)
        .await
        .with_context(|| format!("Failed to read manifest {}", manifest.display()))?;

    let patched = substitute_arch(&content, arch);
    let replaced = content.matches(ARCH_PLACEHOLDER).count();

    tokio::fs::write(manifest, patched)
        .await
        .with_context(|| format!("Failed to write manifest {}", manifest.display()))?;

    info!(
        "Set {} to {} in {} ({} occurrences)",
        ARCH_PLACEHOLDER,
        arch,
        manifest.display(),
        replaced
    );
    Ok(())
}
