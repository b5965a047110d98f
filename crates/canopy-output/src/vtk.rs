//! VTK XML unstructured-grid writer.
//!
//! Each rank writes `<stem>_<rank>.vtu` holding its cells as voxels
//! shrunk about their centers, the per-cell `level` and `mpirank` fields,
//! and every per-corner field of the frame. Rank 0 also writes
//! `<stem>.pvtu` referencing all pieces.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{OutputError, WriteStage};
use crate::frame::OutputFrame;
use crate::SolutionWriter;

/// VTK cell type of an axis-aligned hexahedron with voxel corner order.
pub const VTK_VOXEL: u8 = 11;

/// Writes frames as VTK XML files into a directory.
#[derive(Clone, Debug)]
pub struct VtkWriter {
    dir: PathBuf,
    scale: f64,
    files_written: u64,
}

impl VtkWriter {
    /// Writer placing files in `dir`, drawing cells at `scale` times their
    /// size.
    pub fn new(dir: impl Into<PathBuf>, scale: f64) -> Self {
        Self {
            dir: dir.into(),
            scale,
            files_written: 0,
        }
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of piece files written so far by this writer.
    pub fn files_written(&self) -> u64 {
        self.files_written
    }

    /// Path of the piece `rank` writes for `stem`.
    pub fn piece_path(&self, stem: &str, rank: usize) -> PathBuf {
        self.dir.join(piece_name(stem, rank))
    }

    /// Path of the parallel index for `stem`.
    pub fn index_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.pvtu"))
    }

    fn write_index(&self, frame: &OutputFrame) -> Result<(), OutputError> {
        let path = self.index_path(&frame.stem);
        let stage = |source: io::Error| OutputError::Stage {
            stage: WriteStage::Index,
            path: path.clone(),
            source,
        };
        let mut w = BufWriter::new(File::create(&path).map_err(stage)?);
        encode_index(&mut w, frame)
            .and_then(|()| w.flush())
            .map_err(stage)
    }
}

impl SolutionWriter for VtkWriter {
    fn write_frame(&mut self, frame: &OutputFrame) -> Result<(), OutputError> {
        frame.validate()?;
        let path = self.piece_path(&frame.stem, frame.rank.0);
        let at = |stage: WriteStage| {
            let path = path.clone();
            move |source: io::Error| OutputError::Stage {
                stage,
                path,
                source,
            }
        };

        let file = File::create(&path).map_err(at(WriteStage::Header))?;
        let mut piece = PieceEncoder::new(BufWriter::new(file), self.scale);
        piece.header(frame).map_err(at(WriteStage::Header))?;
        piece.cell_data(frame).map_err(at(WriteStage::CellData))?;
        piece.point_data(frame).map_err(at(WriteStage::PointData))?;
        piece.footer().map_err(at(WriteStage::Footer))?;
        self.files_written += 1;

        if frame.rank.0 == 0 {
            self.write_index(frame)?;
        }
        debug!(
            rank = frame.rank.0,
            cells = frame.cells.len(),
            path = %path.display(),
            "wrote output piece"
        );
        Ok(())
    }
}

fn piece_name(stem: &str, rank: usize) -> String {
    format!("{stem}_{rank:04}.vtu")
}

/// Stage-wise encoder of one piece file.
///
/// Generic over `W: Write` so tests can encode into a `Vec<u8>`.
pub(crate) struct PieceEncoder<W: Write> {
    w: W,
    scale: f64,
}

impl<W: Write> PieceEncoder<W> {
    pub(crate) fn new(w: W, scale: f64) -> Self {
        Self { w, scale }
    }

    pub(crate) fn header(&mut self, frame: &OutputFrame) -> io::Result<()> {
        let n = frame.cells.len();
        let w = &mut self.w;
        writeln!(w, r#"<?xml version="1.0"?>"#)?;
        writeln!(
            w,
            r#"<VTKFile type="UnstructuredGrid" version="0.1" byte_order="LittleEndian">"#
        )?;
        writeln!(w, "  <UnstructuredGrid>")?;
        writeln!(
            w,
            r#"    <Piece NumberOfPoints="{}" NumberOfCells="{n}">"#,
            8 * n
        )?;

        writeln!(w, "      <Points>")?;
        writeln!(
            w,
            r#"        <DataArray type="Float64" Name="Position" NumberOfComponents="3" format="ascii">"#
        )?;
        for cell in &frame.cells {
            for p in cell.scaled_corners(self.scale) {
                writeln!(w, "          {:e} {:e} {:e}", p[0], p[1], p[2])?;
            }
        }
        writeln!(w, "        </DataArray>")?;
        writeln!(w, "      </Points>")?;

        writeln!(w, "      <Cells>")?;
        writeln!(
            w,
            r#"        <DataArray type="Int64" Name="connectivity" format="ascii">"#
        )?;
        for c in 0..n {
            let base = 8 * c;
            let ids: Vec<String> = (base..base + 8).map(|i| i.to_string()).collect();
            writeln!(w, "          {}", ids.join(" "))?;
        }
        writeln!(w, "        </DataArray>")?;
        writeln!(
            w,
            r#"        <DataArray type="Int64" Name="offsets" format="ascii">"#
        )?;
        for c in 0..n {
            writeln!(w, "          {}", 8 * (c + 1))?;
        }
        writeln!(w, "        </DataArray>")?;
        writeln!(
            w,
            r#"        <DataArray type="UInt8" Name="types" format="ascii">"#
        )?;
        for _ in 0..n {
            writeln!(w, "          {VTK_VOXEL}")?;
        }
        writeln!(w, "        </DataArray>")?;
        writeln!(w, "      </Cells>")
    }

    pub(crate) fn cell_data(&mut self, frame: &OutputFrame) -> io::Result<()> {
        let w = &mut self.w;
        writeln!(w, r#"      <CellData Scalars="level,mpirank">"#)?;
        writeln!(
            w,
            r#"        <DataArray type="UInt8" Name="level" format="ascii">"#
        )?;
        for cell in &frame.cells {
            writeln!(w, "          {}", cell.level)?;
        }
        writeln!(w, "        </DataArray>")?;
        writeln!(
            w,
            r#"        <DataArray type="Int32" Name="mpirank" format="ascii">"#
        )?;
        for _ in &frame.cells {
            writeln!(w, "          {}", frame.rank.0)?;
        }
        writeln!(w, "        </DataArray>")?;
        writeln!(w, "      </CellData>")
    }

    pub(crate) fn point_data(&mut self, frame: &OutputFrame) -> io::Result<()> {
        let w = &mut self.w;
        let names: Vec<&str> = frame.corner_fields.iter().map(|f| f.name.as_str()).collect();
        writeln!(w, r#"      <PointData Scalars="{}">"#, names.join(","))?;
        for field in &frame.corner_fields {
            writeln!(
                w,
                r#"        <DataArray type="Float64" Name="{}" format="ascii">"#,
                field.name
            )?;
            for corners in &field.values {
                let vals: Vec<String> = corners.iter().map(|v| format!("{v:e}")).collect();
                writeln!(w, "          {}", vals.join(" "))?;
            }
            writeln!(w, "        </DataArray>")?;
        }
        writeln!(w, "      </PointData>")
    }

    pub(crate) fn footer(mut self) -> io::Result<W> {
        writeln!(self.w, "    </Piece>")?;
        writeln!(self.w, "  </UnstructuredGrid>")?;
        writeln!(self.w, "</VTKFile>")?;
        self.w.flush()?;
        Ok(self.w)
    }
}

fn encode_index<W: Write>(w: &mut W, frame: &OutputFrame) -> io::Result<()> {
    writeln!(w, r#"<?xml version="1.0"?>"#)?;
    writeln!(
        w,
        r#"<VTKFile type="PUnstructuredGrid" version="0.1" byte_order="LittleEndian">"#
    )?;
    writeln!(w, r#"  <PUnstructuredGrid GhostLevel="0">"#)?;
    writeln!(w, "    <PPoints>")?;
    writeln!(
        w,
        r#"      <PDataArray type="Float64" Name="Position" NumberOfComponents="3" format="ascii"/>"#
    )?;
    writeln!(w, "    </PPoints>")?;
    writeln!(w, r#"    <PCellData Scalars="level,mpirank">"#)?;
    writeln!(w, r#"      <PDataArray type="UInt8" Name="level" format="ascii"/>"#)?;
    writeln!(w, r#"      <PDataArray type="Int32" Name="mpirank" format="ascii"/>"#)?;
    writeln!(w, "    </PCellData>")?;
    let names: Vec<&str> = frame.corner_fields.iter().map(|f| f.name.as_str()).collect();
    writeln!(w, r#"    <PPointData Scalars="{}">"#, names.join(","))?;
    for name in &names {
        writeln!(
            w,
            r#"      <PDataArray type="Float64" Name="{name}" format="ascii"/>"#
        )?;
    }
    writeln!(w, "    </PPointData>")?;
    for r in 0..frame.size {
        writeln!(w, r#"    <Piece Source="{}"/>"#, piece_name(&frame.stem, r))?;
    }
    writeln!(w, "  </PUnstructuredGrid>")?;
    writeln!(w, "</VTKFile>")
}
