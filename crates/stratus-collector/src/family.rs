//! Exposition sample families and Prometheus text rendering.

use std::fmt::Write;

/// Exposition metric kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl MetricKind {
    fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

/// One labeled observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

/// A named family of samples sharing help text and kind.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub samples: Vec<Sample>,
}

/// Render families into the Prometheus text exposition format (0.0.4).
pub fn render_text(families: &[MetricFamily]) -> String {
    let mut out = String::new();
    for family in families {
        let _ = writeln!(out, "# HELP {} {}", family.name, escape_help(&family.help));
        let _ = writeln!(out, "# TYPE {} {}", family.name, family.kind.as_str());
        for sample in &family.samples {
            out.push_str(&family.name);
            if !sample.labels.is_empty() {
                out.push('{');
                for (i, (name, value)) in sample.labels.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{name}=\"{}\"", escape_label_value(value));
                }
                out.push('}');
            }
            let _ = writeln!(out, " {}", sample.value);
        }
    }
    out
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(samples: Vec<Sample>) -> MetricFamily {
        MetricFamily {
            name: "aws_elb_request_count_sum".to_string(),
            help: "Sum of requests".to_string(),
            kind: MetricKind::Gauge,
            samples,
        }
    }

    #[test]
    fn renders_help_type_and_samples() {
        let out = render_text(&[family(vec![Sample {
            labels: vec![
                ("job".to_string(), "aws_elb".to_string()),
                ("instance".to_string(), String::new()),
            ],
            value: 42.0,
        }])]);

        assert_eq!(
            out,
            "# HELP aws_elb_request_count_sum Sum of requests\n\
             # TYPE aws_elb_request_count_sum gauge\n\
             aws_elb_request_count_sum{job=\"aws_elb\",instance=\"\"} 42\n"
        );
    }

    #[test]
    fn renders_unlabeled_sample_without_braces() {
        let out = render_text(&[MetricFamily {
            name: "cloudwatch_exporter_scrape_error".to_string(),
            help: "Non-zero if this scrape failed.".to_string(),
            kind: MetricKind::Gauge,
            samples: vec![Sample {
                labels: Vec::new(),
                value: 0.0,
            }],
        }]);
        assert!(out.contains("\ncloudwatch_exporter_scrape_error 0\n"));
    }

    #[test]
    fn escapes_label_values_and_help() {
        let out = render_text(&[MetricFamily {
            name: "m".to_string(),
            help: "line1\nline2 \\ backslash".to_string(),
            kind: MetricKind::Gauge,
            samples: vec![Sample {
                labels: vec![("l".to_string(), "va\"lue\n".to_string())],
                value: 1.5,
            }],
        }]);
        assert!(out.contains("# HELP m line1\\nline2 \\\\ backslash\n"));
        assert!(out.contains("m{l=\"va\\\"lue\\n\"} 1.5\n"));
    }

    #[test]
    fn fractional_values_preserved() {
        let out = render_text(&[family(vec![Sample {
            labels: Vec::new(),
            value: 0.25,
        }])]);
        assert!(out.contains(" 0.25\n"));
    }
}
