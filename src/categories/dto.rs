use serde::Deserialize;

use super::repo_types::CategoryDraft;

/// Body of POST and PUT /categories. Absent or null keys leave the
/// current value alone.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl CategoryPatch {
    pub fn apply(self, draft: &mut CategoryDraft) {
        if let Some(name) = self.name {
            draft.name = name.trim().to_string();
        }
        if let Some(description) = self.description {
            draft.description = Some(description);
        }
    }
}
