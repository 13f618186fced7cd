use crate::utils::error::{CeaError, Result};
use std::collections::HashSet;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(CeaError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(CeaError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(CeaError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_file_extensions(
    field_name: &str,
    files: &[String],
    allowed_extensions: &[&str],
) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    for file in files {
        if let Some(extension) = std::path::Path::new(file)
            .extension()
            .and_then(|ext| ext.to_str())
        {
            if !allowed_set.contains(extension) {
                return Err(CeaError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: file.clone(),
                    reason: format!(
                        "Unsupported file extension: {}. Allowed extensions: {}",
                        extension,
                        allowed_extensions.join(", ")
                    ),
                });
            }
        } else {
            return Err(CeaError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: file.clone(),
                reason: "File has no extension or invalid filename".to_string(),
            });
        }
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CeaError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(CeaError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// 折現率必須大於 -1，否則 (1+r)^t 沒有意義
pub fn validate_discount_rate(field_name: &str, rate: f64) -> Result<()> {
    if !rate.is_finite() || rate <= -1.0 {
        return Err(CeaError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: rate.to_string(),
            reason: "Discount rate must be a finite number greater than -1".to_string(),
        });
    }
    Ok(())
}

pub fn validate_length(field_name: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(CeaError::DimensionMismatch {
            context: field_name.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// 檢查機率向量：每個元素非負且總和為 1 (容許誤差 `tolerance`)
pub fn validate_probability_vector(field_name: &str, values: &[f64], tolerance: f64) -> Result<()> {
    if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
        return Err(CeaError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bad.to_string(),
            reason: "Probabilities must be finite and non-negative".to_string(),
        });
    }

    let total: f64 = values.iter().sum();
    if (total - 1.0).abs() > tolerance {
        return Err(CeaError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: total.to_string(),
            reason: format!("Probabilities must sum to 1 (tolerance {})", tolerance),
        });
    }
    Ok(())
}

pub fn validate_unique_names<'a, I>(field_name: &str, names: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(CeaError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: name.to_string(),
                reason: "Names must be unique".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("output.path", "./output").is_ok());
        assert!(validate_path("output.path", "").is_err());
        assert!(validate_path("output.path", "out\0put").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("simulation.n_cycles", 20, 1).is_ok());
        assert!(validate_positive_number("simulation.n_cycles", 0, 1).is_err());
    }

    #[test]
    fn test_validate_file_extensions() {
        let files = vec!["cea_output.zip".to_string()];
        assert!(validate_file_extensions("output.bundle", &files, &["zip"]).is_ok());

        let invalid_files = vec!["cea_output.tar".to_string()];
        assert!(validate_file_extensions("output.bundle", &invalid_files, &["zip"]).is_err());
    }

    #[test]
    fn test_validate_discount_rate() {
        assert!(validate_discount_rate("discount.costs", 0.035).is_ok());
        assert!(validate_discount_rate("discount.costs", -0.5).is_ok());
        assert!(validate_discount_rate("discount.costs", -1.0).is_err());
        assert!(validate_discount_rate("discount.costs", f64::NAN).is_err());
    }

    #[test]
    fn test_validate_probability_vector() {
        assert!(validate_probability_vector("states.initial", &[1.0, 0.0, 0.0], 1e-9).is_ok());
        assert!(validate_probability_vector("states.initial", &[0.5, 0.4], 1e-9).is_err());
        assert!(validate_probability_vector("states.initial", &[1.5, -0.5], 1e-9).is_err());
    }

    #[test]
    fn test_validate_unique_names() {
        assert!(validate_unique_names("strategies", ["soc", "new"]).is_ok());
        assert!(validate_unique_names("strategies", ["soc", "soc"]).is_err());
    }
}
