use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::{fs, io};

use clap::Parser;
use metricline::registry::StaticMetricRegistry;
use metricline::settings::Settings;
use thiserror::Error;

/// Transcode metricline configuration between formats, or check that its metric registry loads.
#[derive(Parser, Debug)]
#[clap(name = "metricline transcode", author, version, about)]
struct Options {
    /// Source config document to transcode
    config: PathBuf,

    /// from format - defaults to Ron
    #[clap(short, long, default_value = "ron")]
    from: ConfigFormat,

    /// to format
    #[clap(short, long)]
    to: Option<ConfigFormat>,

    /// Load the document as settings and validate its metric registry templates.
    #[clap(long)]
    check_registry: bool,
}

fn main() -> anyhow::Result<()> {
    let options = Options::parse();
    let doc = fs::read_to_string(&options.config)?;

    if options.check_registry {
        let summary = check_registry(&doc, options.from)?;
        eprintln!("{summary}");
    }

    match options.to {
        Some(to) => {
            let mut out = io::stdout();
            transcode(&doc, options.from, to, &mut out)?;
            out.flush()?;
        },
        None if options.check_registry => {},
        None => anyhow::bail!("a target format (--to) is required unless checking the registry"),
    }

    Ok(())
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Yaml,
    Ron,
}

#[derive(Error, Debug)]
#[error("Unknown config format: {0}")]
struct UnknownFormat(String);

impl FromStr for ConfigFormat {
    type Err = UnknownFormat;

    fn from_str(rep: &str) -> Result<Self, Self::Err> {
        match rep.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            "ron" => Ok(Self::Ron),
            s => Err(UnknownFormat(s.to_string())),
        }
    }
}

fn transcode<W: io::Write>(doc: &str, from: ConfigFormat, to: ConfigFormat, out: W) -> anyhow::Result<()> {
    use ConfigFormat::*;

    match (from, to) {
        (Ron, Json) => {
            let mut deser = ron::Deserializer::from_str(doc)?;
            let mut ser = serde_json::Serializer::pretty(out);
            serde_transcode::transcode(&mut deser, &mut ser)?;
        },
        (Ron, Yaml) => {
            let mut deser = ron::Deserializer::from_str(doc)?;
            let mut ser = serde_yaml::Serializer::new(out);
            serde_transcode::transcode(&mut deser, &mut ser)?;
        },
        (Json, Yaml) => {
            let mut deser = serde_json::Deserializer::from_str(doc);
            let mut ser = serde_yaml::Serializer::new(out);
            serde_transcode::transcode(&mut deser, &mut ser)?;
        },
        (Json, Ron) => {
            let mut deser = serde_json::Deserializer::from_str(doc);
            let mut ser = ron::Serializer::new(out, None)?;
            serde_transcode::transcode(&mut deser, &mut ser)?;
        },
        (Yaml, Json) => {
            let deser = serde_yaml::Deserializer::from_str(doc);
            let mut ser = serde_json::Serializer::pretty(out);
            serde_transcode::transcode(deser, &mut ser)?;
        },
        (Yaml, Ron) => {
            let deser = serde_yaml::Deserializer::from_str(doc);
            let mut ser = ron::Serializer::new(out, None)?;
            serde_transcode::transcode(deser, &mut ser)?;
        },
        (from, to) => anyhow::bail!("combination not supported: {:?} => {:?}", from, to),
    }

    Ok(())
}

fn check_registry(doc: &str, from: ConfigFormat) -> anyhow::Result<String> {
    let settings: Settings = match from {
        ConfigFormat::Ron => ron::from_str(doc)?,
        ConfigFormat::Json => serde_json::from_str(doc)?,
        ConfigFormat::Yaml => serde_yaml::from_str(doc)?,
    };

    StaticMetricRegistry::from_settings(&settings.registry)?;

    let nr_properties: usize = settings.registry.components.values().map(|metrics| metrics.len()).sum();
    Ok(format!(
        "metric registry ok: {} components declaring {} properties",
        settings.registry.components.len(),
        nr_properties
    ))
}

#[cfg(test)]
mod tests {
    use claim::*;
    use pretty_assertions::assert_eq;

    use super::*;

    const SETTINGS_RON: &str = r#"(
        registry: (
            components: [
                ("DATANODE", [
                    ("metrics/$1/count", (metric: "foo.(bar|baz).count")),
                    ("metrics/jvm/gcCount", (metric: "jvm.JvmMetrics.GcCount", temporal: false)),
                ]),
            ],
        ),
    )"#;

    #[test]
    fn test_format_from_str() {
        assert_eq!(assert_ok!(ConfigFormat::from_str("YAML")), ConfigFormat::Yaml);
        assert_err!(ConfigFormat::from_str("toml"));
    }

    #[test]
    fn test_transcode_ron_to_json() {
        let mut out = Vec::new();
        assert_ok!(transcode(SETTINGS_RON, ConfigFormat::Ron, ConfigFormat::Json, &mut out));

        let actual: serde_json::Value = assert_ok!(serde_json::from_slice(&out));
        assert_eq!(actual["registry"]["components"][0][0], serde_json::json!("DATANODE"));
        assert_eq!(
            actual["registry"]["components"][0][1][1][1]["metric"],
            serde_json::json!("jvm.JvmMetrics.GcCount")
        );
    }

    #[test]
    fn test_check_registry() {
        let summary = assert_ok!(check_registry(SETTINGS_RON, ConfigFormat::Ron));
        assert_eq!(summary, "metric registry ok: 1 components declaring 2 properties");

        let unbound = r#"(registry: (components: [("DATANODE", [("metrics/$2/count", (metric: "foo.(bar|baz).count"))])]))"#;
        assert_err!(check_registry(unbound, ConfigFormat::Ron));
    }
}
