use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::photo::domain::image_writer::ImageWriter;
use crate::pipeline::cluster_crops_use_case::GroupResult;

/// Saves every member crop as `<output_dir>/<group_id>/<n>.jpg` so a
/// reviewer can browse a group before naming it. `n` is the member's
/// position in the group.
pub struct ExportGroupsUseCase {
    writer: Box<dyn ImageWriter>,
    max_edge: Option<u32>,
}

impl ExportGroupsUseCase {
    pub fn new(writer: Box<dyn ImageWriter>, max_edge: Option<u32>) -> Self {
        Self { writer, max_edge }
    }

    /// Returns group id → written paths, in member order.
    pub fn execute(
        &self,
        groups: &[GroupResult],
        output_dir: &Path,
    ) -> Result<BTreeMap<usize, Vec<PathBuf>>, Box<dyn std::error::Error>> {
        let mut written = BTreeMap::new();

        for group in groups {
            let group_dir = output_dir.join(group.group_id.to_string());
            let mut paths = Vec::with_capacity(group.members.len());
            for (n, member) in group.members.iter().enumerate() {
                let path = group_dir.join(format!("{n}.jpg"));
                self.writer.write(&path, member.crop.image(), self.max_edge)?;
                paths.push(path);
            }
            written.insert(group.group_id, paths);
        }

        log::info!(
            "Wrote {} crops to {}",
            written.values().map(Vec::len).sum::<usize>(),
            output_dir.display()
        );
        Ok(written)
    }
}
