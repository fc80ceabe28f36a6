use anyhow::{bail, Context, Result};
use cogex_survey::SurveyControl;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::Value;
use std::path::Path;

/// Reads a timeline file: an array of entries or a single entry object.
/// Entries without a `type` run the control-question plugin.
pub fn load(path: &Path) -> Result<Vec<Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading timeline {}", path.display()))?;
    parse(&text).with_context(|| format!("parsing timeline {}", path.display()))
}

pub fn parse(text: &str) -> Result<Vec<Value>> {
    let entries = match serde_json::from_str::<Value>(text)? {
        Value::Array(entries) => entries,
        entry @ Value::Object(_) => vec![entry],
        other => bail!("expected an object or an array of objects, found {other}"),
    };
    entries
        .into_iter()
        .enumerate()
        .map(|(i, mut entry)| {
            let Some(fields) = entry.as_object_mut() else {
                bail!("entry {i} is not an object");
            };
            fields
                .entry("type")
                .or_insert_with(|| Value::from(SurveyControl::NAME));
            Ok(entry)
        })
        .collect()
}

pub fn shuffle(entries: &mut [Value], seed: Option<u64>) {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    entries.shuffle(&mut rng);
}
