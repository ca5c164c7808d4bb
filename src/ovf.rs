// src/ovf.rs
//
// Field snapshots in OOMMF OVF 2.0 text format (rectangular mesh, one cell thick).
// The interrupt menu appends the `.omf` suffix before calling the writer.

use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::vector_field::VectorField2D;

/// Suffix appended to operator-supplied snapshot names.
pub const SNAPSHOT_SUFFIX: &str = ".omf";

#[derive(Clone, Debug, Default)]
pub struct OvfMeta {
    pub title: String,
    pub desc_lines: Vec<String>,
    pub valuelabels: [String; 3],
    pub valueunits: [String; 3],
}

impl OvfMeta {
    pub fn magnetization() -> Self {
        Self {
            title: "m".to_string(),
            desc_lines: vec![],
            valuelabels: ["m_x".into(), "m_y".into(), "m_z".into()],
            valueunits: ["1".into(), "1".into(), "1".into()],
        }
    }

    pub fn with_total_sim_time(mut self, t_s: f64) -> Self {
        self.desc_lines
            .push(format!("Total simulation time:  {:.16e}  s", t_s));
        self
    }
}

fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn write_ovf2_text(path: &Path, m: &VectorField2D, meta: &OvfMeta) -> std::io::Result<()> {
    let grid = m.grid;
    let (nx, ny, nz) = (grid.nx, grid.ny, 1usize);

    if m.data.len() != nx * ny {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "VectorField2D length mismatch: got {}, expected {} (nx*ny)",
                m.data.len(),
                nx * ny
            ),
        ));
    }

    ensure_parent_dir(path)?;
    let mut w = BufWriter::new(File::create(path)?);

    writeln!(w, "# OOMMF OVF 2.0")?;
    writeln!(w, "# Segment count: 1")?;
    writeln!(w, "# Begin: Segment")?;
    writeln!(w, "# Begin: Header")?;
    writeln!(w, "# Title: {}", meta.title)?;
    writeln!(w, "# meshtype: rectangular")?;
    writeln!(w, "# meshunit: m")?;

    writeln!(w, "# xmin: {:.16e}", 0.0)?;
    writeln!(w, "# ymin: {:.16e}", 0.0)?;
    writeln!(w, "# zmin: {:.16e}", 0.0)?;
    writeln!(w, "# xmax: {:.16e}", nx as f64 * grid.dx)?;
    writeln!(w, "# ymax: {:.16e}", ny as f64 * grid.dy)?;
    writeln!(w, "# zmax: {:.16e}", nz as f64 * grid.dz)?;

    writeln!(w, "# valuedim: 3")?;
    writeln!(
        w,
        "# valuelabels: {} {} {}",
        meta.valuelabels[0], meta.valuelabels[1], meta.valuelabels[2]
    )?;
    writeln!(
        w,
        "# valueunits: {} {} {}",
        meta.valueunits[0], meta.valueunits[1], meta.valueunits[2]
    )?;
    for d in &meta.desc_lines {
        writeln!(w, "# Desc: {}", d)?;
    }

    writeln!(w, "# xbase: {:.16e}", 0.5 * grid.dx)?;
    writeln!(w, "# ybase: {:.16e}", 0.5 * grid.dy)?;
    writeln!(w, "# zbase: {:.16e}", 0.5 * grid.dz)?;
    writeln!(w, "# xnodes: {}", nx)?;
    writeln!(w, "# ynodes: {}", ny)?;
    writeln!(w, "# znodes: {}", nz)?;
    writeln!(w, "# xstepsize: {:.16e}", grid.dx)?;
    writeln!(w, "# ystepsize: {:.16e}", grid.dy)?;
    writeln!(w, "# zstepsize: {:.16e}", grid.dz)?;
    writeln!(w, "# End: Header")?;
    writeln!(w, "# Begin: Data Text")?;

    // x fastest, then y
    for v in &m.data {
        writeln!(w, "{:.10e} {:.10e} {:.10e}", v[0], v[1], v[2])?;
    }

    writeln!(w, "# End: Data Text")?;
    writeln!(w, "# End: Segment")?;
    w.flush()?;
    Ok(())
}

/// Destination for snapshots requested from the interrupt menu.
pub trait SnapshotWriter {
    fn write_snapshot(&mut self, path: &Path, m: &VectorField2D, t: f64) -> std::io::Result<()>;
}

#[derive(Debug, Default)]
pub struct OvfSnapshotWriter;

impl SnapshotWriter for OvfSnapshotWriter {
    fn write_snapshot(&mut self, path: &Path, m: &VectorField2D, t: f64) -> std::io::Result<()> {
        write_ovf2_text(path, m, &OvfMeta::magnetization().with_total_sim_time(t))
    }
}
