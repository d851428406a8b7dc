//! Input and output location resolution.
//!
//! Templates use `{year}` and `{month}` placeholders with an optional
//! `:[0][width][d]` format spec, so `{month:02d}` renders March as `03`.
//! `{{` and `}}` produce literal braces.

use crate::config::JobConfig;
use crate::error::{Result, ScoringError};

/// Resolved locations for one (year, month) partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locations {
    pub input: String,
    pub output: String,
}

/// Formats the configured input/output templates for a partition.
#[derive(Debug, Clone)]
pub struct PathResolver {
    input_pattern: String,
    output_pattern: String,
}

impl PathResolver {
    pub fn new(config: &JobConfig) -> Self {
        Self {
            input_pattern: config.input_file_pattern.clone(),
            output_pattern: config.output_file_pattern.clone(),
        }
    }

    pub fn resolve_input(&self, year: i32, month: i32) -> Result<String> {
        render_template(&self.input_pattern, year, month)
    }

    pub fn resolve_output(&self, year: i32, month: i32) -> Result<String> {
        render_template(&self.output_pattern, year, month)
    }

    pub fn resolve(&self, year: i32, month: i32) -> Result<Locations> {
        Ok(Locations {
            input: self.resolve_input(year, month)?,
            output: self.resolve_output(year, month)?,
        })
    }
}

/// Substitutes `year` and `month` into `template`.
///
/// # Errors
///
/// Returns [`ScoringError::Config`] for unbalanced braces, unknown
/// placeholder names and unsupported format specs.
pub fn render_template(template: &str, year: i32, month: i32) -> Result<String> {
    let mut out = String::with_capacity(template.len() + 8);
    let mut rest = template;

    while let Some(i) = rest.find(|c| c == '{' || c == '}') {
        out.push_str(&rest[..i]);
        let tail = &rest[i..];

        if let Some(after) = tail.strip_prefix("{{") {
            out.push('{');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("}}") {
            out.push('}');
            rest = after;
        } else if tail.starts_with('}') {
            return Err(malformed(template, "single '}' encountered"));
        } else {
            let close = tail
                .find('}')
                .ok_or_else(|| malformed(template, "unclosed '{'"))?;
            let field = &tail[1..close];
            if field.contains('{') {
                return Err(malformed(template, "nested '{' in placeholder"));
            }
            out.push_str(&render_field(template, field, year, month)?);
            rest = &tail[close + 1..];
        }
    }

    out.push_str(rest);
    Ok(out)
}

fn render_field(template: &str, field: &str, year: i32, month: i32) -> Result<String> {
    let (name, spec) = field.split_once(':').unwrap_or((field, ""));

    let value = match name {
        "year" => year,
        "month" => month,
        "" => return Err(malformed(template, "positional placeholder '{}'")),
        other => return Err(malformed(template, &format!("unknown placeholder '{other}'"))),
    };

    let spec = spec.strip_suffix('d').unwrap_or(spec);
    if spec.is_empty() {
        return Ok(value.to_string());
    }

    let (zero_pad, digits) = match spec.strip_prefix('0') {
        Some(digits) => (true, digits),
        None => (false, spec),
    };
    let width = if digits.is_empty() {
        0
    } else {
        digits
            .parse::<usize>()
            .map_err(|_| malformed(template, &format!("unsupported format spec '{spec}'")))?
    };

    Ok(if zero_pad {
        format!("{value:0width$}")
    } else {
        format!("{value:>width$}")
    })
}

fn malformed(template: &str, reason: &str) -> ScoringError {
    ScoringError::Config(format!("malformed location template '{template}': {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobConfig;

    fn resolver(vars: &[(&'static str, &'static str)]) -> PathResolver {
        let vars = vars.to_vec();
        let config = JobConfig::from_lookup(move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        });
        PathResolver::new(&config)
    }

    #[test]
    fn test_default_input_location() {
        let input = resolver(&[]).resolve_input(2023, 3).unwrap();
        assert_eq!(
            input,
            "https://d37ci6vzurychx.cloudfront.net/trip-data/yellow_tripdata_2023-03.parquet"
        );
    }

    #[test]
    fn test_default_output_location() {
        let output = resolver(&[]).resolve_output(2023, 3).unwrap();
        assert_eq!(
            output,
            "s3://nyc-duration-prediction-alexey/taxi_type=fhv/year=2023/month=03/predictions.parquet"
        );
    }

    #[test]
    fn test_input_override_uses_same_substitution() {
        let paths = resolver(&[(
            "INPUT_FILE_PATTERN",
            "s3://nyc-duration/in/{year:04d}-{month:02d}.parquet",
        )]);

        assert_eq!(
            paths.resolve_input(2023, 3).unwrap(),
            "s3://nyc-duration/in/2023-03.parquet"
        );
    }

    #[test]
    fn test_resolve_returns_both_locations() {
        let paths = resolver(&[
            ("INPUT_FILE_PATTERN", "in/{year}/{month}"),
            ("OUTPUT_FILE_PATTERN", "out/{year}/{month:02}"),
        ]);

        let locations = paths.resolve(2021, 1).unwrap();
        assert_eq!(locations.input, "in/2021/1");
        assert_eq!(locations.output, "out/2021/01");
    }

    #[test]
    fn test_render_plain_and_padded_placeholders() {
        assert_eq!(render_template("{year}-{month}", 2023, 3).unwrap(), "2023-3");
        assert_eq!(render_template("{year:d}", 987, 1).unwrap(), "987");
        assert_eq!(render_template("{year:04d}", 987, 1).unwrap(), "0987");
        assert_eq!(render_template("[{month:3d}]", 2023, 7).unwrap(), "[  7]");
    }

    #[test]
    fn test_render_escaped_braces() {
        assert_eq!(
            render_template("{{literal}}/{year}", 2022, 2).unwrap(),
            "{literal}/2022"
        );
    }

    #[test]
    fn test_render_without_placeholders_is_verbatim() {
        assert_eq!(
            render_template("data/fixed.parquet", 2022, 2).unwrap(),
            "data/fixed.parquet"
        );
    }

    #[test]
    fn test_malformed_templates_are_config_errors() {
        for template in [
            "in/{year",
            "in/year}",
            "in/{day}",
            "in/{}",
            "in/{year:x}",
            "in/{year:04.2f}",
            "in/{ye{ar}",
        ] {
            let err = render_template(template, 2023, 3).unwrap_err();
            assert!(
                matches!(err, ScoringError::Config(_)),
                "expected config error for {template}"
            );
        }
    }

    #[test]
    fn test_malformed_override_propagates_from_resolver() {
        let paths = resolver(&[("OUTPUT_FILE_PATTERN", "out/{year}/{quarter}")]);

        assert!(paths.resolve_input(2023, 3).is_ok());
        assert!(matches!(
            paths.resolve_output(2023, 3),
            Err(ScoringError::Config(_))
        ));
        assert!(paths.resolve(2023, 3).is_err());
    }
}
