//! Folder contexts: where each input folder's outputs live.

use std::path::{Path, PathBuf};

use crate::{FolderContext, RunOpts};

/// Primary output name for `input_name`: input token replaced by primary token
/// (`INPUT_AI_clip` → `UPSCALED_clip`).
pub fn primary_name(input_name: &str, opts: &RunOpts) -> String {
    input_name.replace(&opts.input_token, &opts.primary_token)
}

/// Mirror path for a primary output named `primary_name`: primary token replaced by the
/// secondary token, under `secondary_base` (`UPSCALED_clip` → `<base>/OUTPUT_clip`).
pub fn secondary_path(primary_name: &str, secondary_base: &Path, opts: &RunOpts) -> PathBuf {
    secondary_base.join(primary_name.replace(&opts.primary_token, &opts.secondary_token))
}

impl FolderContext {
    /// Derive the context for one configured input folder. Pure; nothing is created.
    pub fn derive(input_name: &str, opts: &RunOpts) -> Self {
        let primary = primary_name(input_name, opts);
        let secondary_out = opts
            .secondary_base
            .as_deref()
            .map(|base| secondary_path(&primary, base, opts));
        FolderContext {
            label: input_name.to_string(),
            source_dir: opts.work_dir.join(input_name),
            primary_out: opts.work_dir.join(&primary),
            secondary_out,
        }
    }
}

/// Contexts for every configured input folder, in configured order.
pub fn folder_contexts(opts: &RunOpts) -> Vec<FolderContext> {
    opts.input_dirs
        .iter()
        .map(|name| FolderContext::derive(name, opts))
        .collect()
}
