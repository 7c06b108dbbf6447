use std::collections::BTreeMap;

use anyhow::{Result, bail};

use crate::config::FallbackSection;

pub const DEFAULT_ICON: &str = "simple-icons:python";

/// Known Arabic (and a few untranslated) tech-stack names and their icons.
const BUILTIN_ICONS: &[(&str, &str)] = &[
    ("بايثون", "simple-icons:python"),
    ("ر", "simple-icons:r"),
    ("أوس", "simple-icons:amazonaws"),
    ("أزور", "simple-icons:microsoftazure"),
    ("Google Cloud Platform", "simple-icons:googlecloud"),
    ("ندفة الثلج", "simple-icons:snowflake"),
    ("طوب البيانات", "simple-icons:databricks"),
    ("لوحة", "simple-icons:tableau"),
    ("الطاقة بي", "simple-icons:powerbi"),
    ("الناظر", "simple-icons:looker"),
    ("قاعدة التعريف", "simple-icons:metabase"),
    ("أباتشي سوبرسيت", "simple-icons:apachesuperset"),
    ("dbt", "simple-icons:dbt"),
    ("تدفق الهواء", "simple-icons:apacheairflow"),
    ("شرارة", "simple-icons:apachespark"),
    ("كافكا", "simple-icons:apachekafka"),
    ("TensorFlow", "simple-icons:tensorflow"),
    ("باي تورش", "simple-icons:pytorch"),
    ("تعانق الوجه", "simple-icons:huggingface"),
    ("Scikit تعلم", "simple-icons:scikitlearn"),
    ("MLflow", "simple-icons:mlflow"),
    ("كوكب المشتري", "simple-icons:jupyter"),
    ("الباندا", "simple-icons:pandas"),
    ("NumPy", "simple-icons:numpy"),
    ("PostgreSQL", "simple-icons:postgresql"),
    ("MongoDB", "simple-icons:mongodb"),
    ("ريديس", "simple-icons:redis"),
    ("بحث مرن", "simple-icons:elasticsearch"),
    ("بوابة", "simple-icons:git"),
    ("عامل ميناء", "simple-icons:docker"),
    ("كوبيرنيتيس", "simple-icons:kubernetes"),
    ("جرافانا", "simple-icons:grafana"),
    ("بروميثيوس", "simple-icons:prometheus"),
    ("InfluxDB", "simple-icons:influxdb"),
    ("صرصورDB", "simple-icons:cockroachlabs"),
    ("كاساندرا", "simple-icons:apachecassandra"),
    ("قارورة", "simple-icons:flask"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackTable {
    icons: BTreeMap<String, String>,
    default_icon: String,
}

impl Default for FallbackTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FallbackTable {
    pub fn builtin() -> Self {
        Self {
            icons: BUILTIN_ICONS
                .iter()
                .map(|(name, icon)| ((*name).to_string(), (*icon).to_string()))
                .collect(),
            default_icon: DEFAULT_ICON.to_string(),
        }
    }

    /// Built-in table with `[fallback]` entries layered on top.
    pub fn from_config(section: &FallbackSection) -> Result<Self> {
        let mut table = Self::builtin();
        if let Some(default_icon) = &section.default_icon {
            let default_icon = default_icon.trim();
            if default_icon.is_empty() {
                bail!("fallback.default_icon cannot be empty");
            }
            table.default_icon = default_icon.to_string();
        }
        for (name, icon) in &section.icons {
            let icon = icon.trim();
            if icon.is_empty() {
                bail!("fallback icon for `{name}` cannot be empty");
            }
            table.icons.insert(name.clone(), icon.to_string());
        }
        Ok(table)
    }

    /// Exact-name lookup; no folding.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.icons.get(name).map(String::as_str)
    }

    pub fn default_icon(&self) -> &str {
        &self.default_icon
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.icons
            .iter()
            .map(|(name, icon)| (name.as_str(), icon.as_str()))
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}
