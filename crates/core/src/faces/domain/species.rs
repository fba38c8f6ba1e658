use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Human,
    Cat,
    /// Result of merging faces of different species.
    Hybrid,
}

impl Species {
    /// Species of a face merged from `self` and `other`.
    pub fn merged_with(self, other: Species) -> Species {
        match (self, other) {
            (Species::Human, Species::Human) => Species::Human,
            (Species::Cat, Species::Cat) => Species::Cat,
            _ => Species::Hybrid,
        }
    }
}
