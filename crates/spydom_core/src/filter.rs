use std::collections::BTreeSet;

/// Enable/disable selection over task slugs.
///
/// When `enabled` is non-empty only those slugs survive; `disabled` is then
/// removed from whatever remains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    enabled: BTreeSet<String>,
    disabled: BTreeSet<String>,
}

impl TaskFilter {
    pub fn new<E, D>(enabled: E, disabled: D) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        Self {
            enabled: clean(enabled),
            disabled: clean(disabled),
        }
    }

    /// Add one more slug to the disabled set.
    pub fn disable(&mut self, slug: impl Into<String>) {
        self.disabled.insert(slug.into());
    }

    pub fn allows(&self, slug: &str) -> bool {
        (self.enabled.is_empty() || self.enabled.contains(slug)) && !self.disabled.contains(slug)
    }

    /// Slugs from `known`, in their original order, that pass the filter.
    pub fn apply<'a, I>(&self, known: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        known.into_iter().filter(|slug| self.allows(slug)).collect()
    }

    /// Slugs named by the filter that are not in `known`.
    pub fn unknown<'a, I>(&self, known: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let known: BTreeSet<&str> = known.into_iter().collect();
        self.enabled
            .iter()
            .chain(self.disabled.iter())
            .filter(|slug| !known.contains(slug.as_str()))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn clean<I>(slugs: I) -> BTreeSet<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    slugs
        .into_iter()
        .map(Into::into)
        .map(|slug| slug.trim().to_string())
        .filter(|slug| !slug.is_empty())
        .collect()
}
