//! Task label based reporter configuration
//!
//! Failed tasks carry labels that decide which reporter instances receive
//! them and how each instance is configured. Keys are namespaced by the
//! complainer name so several complainers can watch one cluster:
//!
//! ```text
//! complainer_<name>_<reporter>_instances            = a,b
//! complainer_<reporter>_instances                   (name == default)
//! complainer_<name>_<reporter>_instance_<inst>_<key>
//! complainer_<reporter>_instance_<inst>_<key>       (name == default)
//! complainer_<name>_<reporter>_<key>                (inst == default)
//! complainer_<reporter>_<key>                       (both default)
//! ```

use std::collections::HashMap;
use std::fmt;

/// Name of the implicit complainer and of the implicit reporter instance
pub const DEFAULT_NAME: &str = "default";

#[derive(Debug, Clone)]
pub struct Labels<'a> {
    complainer: &'a str,
    labels: &'a HashMap<String, String>,
    defaults: bool,
}

impl<'a> Labels<'a> {
    /// `defaults` decides whether unlabelled tasks go to the default instance
    /// of every reporter.
    pub fn new(complainer: &'a str, labels: &'a HashMap<String, String>, defaults: bool) -> Self {
        Self {
            complainer,
            labels,
            defaults,
        }
    }

    /// Instances of `reporter` configured for this task.
    ///
    /// The first present key wins, an empty value disables the reporter.
    pub fn instances(&self, reporter: &str) -> Vec<String> {
        let mut keys = vec![format!("complainer_{}_{reporter}_instances", self.complainer)];

        if self.complainer == DEFAULT_NAME {
            keys.push(format!("complainer_{reporter}_instances"));
        }

        if let Some(instances) = keys.iter().find_map(|key| self.labels.get(key)) {
            if instances.is_empty() {
                return Vec::new();
            }
            return instances.split(',').map(str::to_string).collect();
        }

        if self.defaults {
            vec![DEFAULT_NAME.to_string()]
        } else {
            Vec::new()
        }
    }

    /// Value of `key` for an instance of `reporter`, most specific key first.
    ///
    /// Returns an empty string when nothing is set.
    pub fn instance_label(&self, reporter: &str, instance: &str, key: &str) -> String {
        let complainer = self.complainer;

        // complainer_default_sentry_instance_default_dsn
        let mut keys = vec![format!(
            "complainer_{complainer}_{reporter}_instance_{instance}_{key}"
        )];

        if complainer == DEFAULT_NAME {
            // complainer_sentry_instance_default_dsn
            keys.push(format!("complainer_{reporter}_instance_{instance}_{key}"));
        }

        if instance == DEFAULT_NAME {
            // complainer_default_sentry_dsn
            keys.push(format!("complainer_{complainer}_{reporter}_{key}"));
        }

        if complainer == DEFAULT_NAME && instance == DEFAULT_NAME {
            // complainer_sentry_dsn
            keys.push(format!("complainer_{reporter}_{key}"));
        }

        keys.iter()
            .filter_map(|key| self.labels.get(key))
            .find(|value| !value.is_empty())
            .cloned()
            .unwrap_or_default()
    }

    /// Accessor bound to one reporter instance
    pub fn provider(&self, reporter: &'a str, instance: &'a str) -> ConfigProvider<'a> {
        ConfigProvider {
            labels: self.clone(),
            reporter,
            instance,
        }
    }
}

impl fmt::Display for Labels<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.complainer, self.labels)
    }
}

/// Configuration of a single reporter instance, resolved from task labels
#[derive(Debug, Clone)]
pub struct ConfigProvider<'a> {
    labels: Labels<'a>,
    reporter: &'a str,
    instance: &'a str,
}

impl ConfigProvider<'_> {
    pub fn get(&self, key: &str) -> String {
        self.labels
            .instance_label(self.reporter, self.instance, key)
    }

    /// Label value, or `fallback` when the label is unset
    pub fn get_or(&self, key: &str, fallback: &str) -> String {
        let value = self.get(key);
        if value.is_empty() {
            fallback.to_string()
        } else {
            value
        }
    }

    pub fn instance(&self) -> &str {
        self.instance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_no_labels_uses_default_instance() {
        let map = labels(&[]);
        let l = Labels::new(DEFAULT_NAME, &map, true);

        assert_eq!(l.instances("hipchat"), vec!["default"]);
        assert_eq!(l.instances("sentry"), vec!["default"]);
    }

    #[test]
    fn test_no_labels_without_defaults() {
        let map = labels(&[]);
        let l = Labels::new(DEFAULT_NAME, &map, false);

        assert!(l.instances("hipchat").is_empty());
        assert!(l.instances("sentry").is_empty());
    }

    #[test]
    fn test_short_instances_key() {
        let map = labels(&[("complainer_sentry_instances", "woo")]);
        let l = Labels::new(DEFAULT_NAME, &map, true);

        assert_eq!(l.instances("hipchat"), vec!["default"]);
        assert_eq!(l.instances("sentry"), vec!["woo"]);
    }

    #[test]
    fn test_empty_instances_disables_reporter() {
        let map = labels(&[("complainer_sentry_instances", "")]);
        let l = Labels::new(DEFAULT_NAME, &map, true);

        assert_eq!(l.instances("hipchat"), vec!["default"]);
        assert!(l.instances("sentry").is_empty());
    }

    #[test]
    fn test_qualified_instances_key_wins() {
        let map = labels(&[
            ("complainer_sentry_instances", "a,b"),
            ("complainer_default_sentry_instances", "c"),
        ]);
        let l = Labels::new(DEFAULT_NAME, &map, true);

        assert_eq!(l.instances("sentry"), vec!["c"]);
    }

    #[test]
    fn test_short_keys_ignored_for_named_complainer() {
        let map = labels(&[
            ("complainer_sentry_instances", "a"),
            ("complainer_sentry_dsn", "global-dsn"),
        ]);
        let l = Labels::new("wow", &map, true);

        assert_eq!(l.instances("sentry"), vec!["default"]);
        assert_eq!(l.instance_label("sentry", "default", "dsn"), "");
    }

    #[test]
    fn test_named_complainer_with_instances() {
        let map = labels(&[
            ("complainer_wow_hipchat_instances", "default,sre"),
            ("complainer_wow_hipchat_room", "complains"),
            ("complainer_wow_hipchat_token", "heya"),
            ("complainer_wow_hipchat_instance_sre_room", "sre-complains"),
            ("complainer_wow_hipchat_instance_sre_token", "sosad"),
            ("complainer_wow_sentry_dsn", "not-dsn"),
        ]);

        let l = Labels::new("wow", &map, true);
        assert_eq!(l.instances("hipchat"), vec!["default", "sre"]);
        assert_eq!(l.instances("sentry"), vec!["default"]);

        assert_eq!(l.instance_label("hipchat", "default", "room"), "complains");
        assert_eq!(l.instance_label("hipchat", "default", "token"), "heya");
        assert_eq!(l.instance_label("hipchat", "sre", "room"), "sre-complains");
        assert_eq!(l.instance_label("hipchat", "sre", "token"), "sosad");
        assert_eq!(l.instance_label("sentry", "default", "dsn"), "not-dsn");

        let l = Labels::new("wow", &map, false);
        assert_eq!(l.instances("hipchat"), vec!["default", "sre"]);
        assert!(l.instances("sentry").is_empty());
    }

    #[test]
    fn test_explicit_default_instance_without_defaults() {
        let map = labels(&[("complainer_dogfood_sentry_instances", "default")]);
        let l = Labels::new("dogfood", &map, false);

        assert!(l.instances("hipchat").is_empty());
        assert_eq!(l.instances("sentry"), vec!["default"]);
    }

    #[test]
    fn test_instance_label_precedence() {
        let map = labels(&[
            ("complainer_slack_channel", "#global"),
            ("complainer_default_slack_channel", "#identity"),
            ("complainer_slack_instance_default_channel", "#instance"),
            ("complainer_default_slack_instance_default_channel", "#both"),
        ]);
        let l = Labels::new(DEFAULT_NAME, &map, true);
        assert_eq!(l.instance_label("slack", "default", "channel"), "#both");

        let map = labels(&[
            ("complainer_slack_channel", "#global"),
            ("complainer_default_slack_channel", "#identity"),
            ("complainer_slack_instance_default_channel", "#instance"),
        ]);
        let l = Labels::new(DEFAULT_NAME, &map, true);
        assert_eq!(l.instance_label("slack", "default", "channel"), "#instance");

        let map = labels(&[
            ("complainer_slack_channel", "#global"),
            ("complainer_default_slack_channel", "#identity"),
        ]);
        let l = Labels::new(DEFAULT_NAME, &map, true);
        assert_eq!(l.instance_label("slack", "default", "channel"), "#identity");

        let map = labels(&[("complainer_slack_channel", "#global")]);
        let l = Labels::new(DEFAULT_NAME, &map, true);
        assert_eq!(l.instance_label("slack", "default", "channel"), "#global");
    }

    #[test]
    fn test_empty_value_falls_through() {
        let map = labels(&[
            ("complainer_default_slack_channel", ""),
            ("complainer_slack_channel", "#global"),
        ]);
        let l = Labels::new(DEFAULT_NAME, &map, true);

        assert_eq!(l.instance_label("slack", "default", "channel"), "#global");
    }

    #[test]
    fn test_non_default_instance_ignores_instance_less_keys() {
        let map = labels(&[("complainer_slack_channel", "#global")]);
        let l = Labels::new(DEFAULT_NAME, &map, true);

        assert_eq!(l.instance_label("slack", "sre", "channel"), "");
    }

    #[test]
    fn test_provider() {
        let map = labels(&[
            ("complainer_slack_instances", "default,sre"),
            ("complainer_slack_channel", "#global"),
            ("complainer_slack_instance_sre_channel", "#sre"),
        ]);
        let l = Labels::new(DEFAULT_NAME, &map, true);

        let default = l.provider("slack", "default");
        let sre = l.provider("slack", "sre");

        assert_eq!(default.get("channel"), "#global");
        assert_eq!(sre.get("channel"), "#sre");
        assert_eq!(sre.get("username"), "");
        assert_eq!(sre.get_or("username", "complainer"), "complainer");
        assert_eq!(sre.instance(), "sre");
    }

    #[test]
    fn test_display() {
        let map = labels(&[("complainer_file_instances", "")]);
        let l = Labels::new("ops", &map, true);

        assert_eq!(
            l.to_string(),
            r#"ops ({"complainer_file_instances": ""})"#
        );
    }
}
