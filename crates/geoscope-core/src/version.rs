use std::cmp::Ordering;

pub const INITIAL_VERSION: &str = "1.0";

/// Split a "major.minor" label into numeric components.
pub fn parse_version(label: &str) -> anyhow::Result<(u64, u64)> {
    let parts: Vec<&str> = label.split('.').collect();
    if parts.len() != 2 {
        anyhow::bail!("invalid version label '{}' (expected major.minor)", label);
    }
    let major: u64 = parts[0]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid major component in version '{}'", label))?;
    let minor: u64 = parts[1]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid minor component in version '{}'", label))?;
    Ok((major, minor))
}

/// Components compare as integers, never as floats: "1.10" > "1.9".
/// Unparseable labels compare as (0, 0), lowest.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let ta = parse_version(a).unwrap_or((0, 0));
    let tb = parse_version(b).unwrap_or((0, 0));
    ta.cmp(&tb)
}

pub fn bump_minor(label: &str) -> anyhow::Result<String> {
    let (major, minor) = parse_version(label)?;
    Ok(format!("{}.{}", major, minor + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_major_minor() {
        assert_eq!(parse_version("1.4").unwrap(), (1, 4));
        assert_eq!(parse_version("12.0").unwrap(), (12, 0));
        assert!(parse_version("1").is_err());
        assert!(parse_version("1.2.3").is_err());
        assert!(parse_version("1.x").is_err());
    }

    #[test]
    fn numeric_component_compare() {
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_versions("2.0", "1.99"), Ordering::Greater);
        assert_eq!(compare_versions("1.4", "1.4"), Ordering::Equal);
        assert_eq!(compare_versions("1.3", "1.4"), Ordering::Less);
    }

    #[test]
    fn bump_increments_minor_only() {
        assert_eq!(bump_minor("1.3").unwrap(), "1.4");
        assert_eq!(bump_minor("1.9").unwrap(), "1.10");
        assert_eq!(bump_minor("3.0").unwrap(), "3.1");
    }
}
