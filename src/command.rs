use serde_yaml::Mapping;

use crate::client::{ReleaseService, UpdateOptions};
use crate::error::{Result, UpdateError};
use crate::templates;
use crate::values;

pub struct UpdateCommand {
    pub release: String,
    pub value_files: Vec<String>,
    pub set_values: Vec<String>,
    pub template_counts: Vec<String>,
    pub reset_values: bool,
}

impl UpdateCommand {
    pub fn run(&self, client: &dyn ReleaseService) -> Result<()> {
        // Parse everything local before touching the network, so a bad flag
        // never leaves the release half-updated.
        let overrides = values::build_overrides(&self.value_files, &self.set_values)?;
        let scale_requests = self
            .template_counts
            .iter()
            .map(|raw| templates::parse_scale_request(raw))
            .collect::<Result<Vec<_>>>()?;

        let mut merged = if self.reset_values {
            Mapping::new()
        } else {
            client.stored_values(&self.release)?
        };
        values::merge_values(&mut merged, overrides);
        let payload = serde_yaml::to_string(&merged).map_err(UpdateError::Serialize)?;

        let revised_templates = if scale_requests.is_empty() {
            None
        } else {
            let mut current = client.current_templates(&self.release)?;
            templates::apply_scaling(&mut current, &scale_requests)?;
            Some(current)
        };

        client.submit_update(
            &self.release,
            revised_templates.as_deref(),
            payload.as_bytes(),
            &UpdateOptions {
                reset_values: self.reset_values,
            },
        )
    }
}
