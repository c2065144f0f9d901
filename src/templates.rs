use crate::error::{Result, UpdateError};

/// Marks where a template's payload starts; everything before the first
/// separator is a header that gets regenerated when a template is cloned.
pub const DOCUMENT_SEPARATOR: &str = "---";

/// Families the scaler knows how to clone. Requests for anything else are
/// skipped with a diagnostic so newer callers stay compatible.
pub const SCALABLE_FAMILIES: &[&str] = &["diego-cell"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub data: Vec<u8>,
}

pub fn template_name(family: &str, index: usize) -> String {
    format!("templates/{family}-{index}.yaml")
}

fn identity_line(family: &str, index: usize) -> String {
    format!("name: \"{family}-{index}\"")
}

pub fn family_count(templates: &[Template], family: &str) -> usize {
    templates.iter().filter(|t| t.name.contains(family)).count()
}

/// Parses one `family=count` request from `--set-template`.
pub fn parse_scale_request(input: &str) -> Result<(String, i64)> {
    let invalid = |reason: &str| UpdateError::InvalidOverride {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let (family, raw) = input.split_once('=').ok_or_else(|| invalid("missing '='"))?;
    let family = family.trim();
    if family.is_empty() {
        return Err(invalid("empty template family"));
    }
    let count = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| invalid("replica count must be an integer"))?;
    Ok((family.to_string(), count))
}

/// Applies the first recognized scaling request and stops; one family per
/// invocation. Unrecognized families are logged and skipped, not failed.
pub fn apply_scaling(templates: &mut Vec<Template>, requests: &[(String, i64)]) -> Result<()> {
    for (family, desired) in requests {
        if !SCALABLE_FAMILIES.contains(&family.as_str()) {
            log::warn!("scaling of {family} is not supported, skipping");
            continue;
        }
        let desired = usize::try_from(*desired).map_err(|_| UpdateError::InvalidOverride {
            input: format!("{family}={desired}"),
            reason: "replica count must be non-negative".to_string(),
        })?;
        return scale_family(templates, family, desired);
    }
    Ok(())
}

/// Scales the family to `desired` members in place. Deletion and addition are
/// mutually exclusive; a failed deletion mid-way leaves the deletions already
/// applied in the list, so the caller must not submit after an error.
pub fn scale_family(templates: &mut Vec<Template>, family: &str, desired: usize) -> Result<()> {
    let current = family_count(templates, family);

    if current > desired {
        log::info!("scaling {family} down from {current} to {desired}");
        for index in (desired..current).rev() {
            remove_template(templates, &template_name(family, index))?;
        }
    } else if current < desired {
        log::info!("scaling {family} up from {current} to {desired}");
        add_clones(templates, family, current, desired)?;
    } else {
        log::info!("{family} already has {desired} templates, skipping");
    }

    Ok(())
}

fn remove_template(templates: &mut Vec<Template>, name: &str) -> Result<()> {
    match templates.iter().position(|t| t.name.trim() == name) {
        Some(index) => {
            templates.remove(index);
            Ok(())
        }
        None => Err(UpdateError::TemplateNotFound {
            name: name.to_string(),
        }),
    }
}

fn add_clones(
    templates: &mut Vec<Template>,
    family: &str,
    current: usize,
    desired: usize,
) -> Result<()> {
    let canonical_name = template_name(family, 0);
    let canonical = templates
        .iter()
        .find(|t| t.name.trim() == canonical_name)
        .ok_or_else(|| UpdateError::TemplateNotFound {
            name: canonical_name.clone(),
        })?;

    let source =
        std::str::from_utf8(&canonical.data).map_err(|_| UpdateError::MalformedTemplate {
            name: canonical_name.clone(),
            reason: "content is not valid UTF-8".to_string(),
        })?;

    let mut clones = Vec::with_capacity(desired - current);
    for index in current..desired {
        let renamed = source.replacen(&identity_line(family, 0), &identity_line(family, index), 1);
        let (_, payload) =
            renamed
                .split_once(DOCUMENT_SEPARATOR)
                .ok_or_else(|| UpdateError::MalformedTemplate {
                    name: canonical_name.clone(),
                    reason: "missing document separator".to_string(),
                })?;
        clones.push(Template {
            name: template_name(family, index),
            data: format!("{DOCUMENT_SEPARATOR}{payload}").into_bytes(),
        });
    }
    templates.extend(clones);

    Ok(())
}
