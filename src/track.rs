//! The track the [vehicle](crate::vehicle::Vehicle) drives on, classified from a raster image.

use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// An RGB color triple.
pub type Rgb = [u8; 3];

/// Pure black is always treated as road, whatever the palette's road color is.
const BLACK: Rgb = [0, 0, 0];

/// Errors raised while building a [track](TrackMap) or locating its start.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("failed to load track image: {0}")]
    Image(#[from] image::ImageError),
    #[error("cell grid has {got} cells, expected {expected}")]
    GridSize { expected: usize, got: usize },
    #[error("track has no start line pixel")]
    NoStartLine,
    #[error("start line pixel at ({x}, {y}) has no adjacent road pixel")]
    StartLineIsolated { x: usize, y: usize },
}

/// Classification of a single track cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Road,
    Checkpoint,
    StartLine,
    Off,
}

impl Cell {
    /// Whether the cell counts as drivable track.
    pub fn on_track(self) -> bool {
        !matches!(self, Cell::Off)
    }
}

/// The reserved colors of a track raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackPalette {
    pub road: Rgb,
    pub checkpoint: Rgb,
    pub start_line: Rgb,
    pub background: Rgb,
}

impl Default for TrackPalette {
    fn default() -> Self {
        TrackPalette {
            road: BLACK,
            checkpoint: [128, 128, 128],
            start_line: [255, 255, 0],
            background: [255, 255, 255],
        }
    }
}

impl TrackPalette {
    /// Maps a pixel color to its cell class by exact match.
    pub fn classify(&self, color: Rgb) -> Cell {
        if color == self.background {
            Cell::Off
        } else if color == self.road || color == BLACK {
            Cell::Road
        } else if color == self.checkpoint {
            Cell::Checkpoint
        } else if color == self.start_line {
            Cell::StartLine
        } else {
            Cell::Off
        }
    }
}

/// Where and in which direction a [vehicle](crate::vehicle::Vehicle) starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartPose {
    pub x: f64,
    pub y: f64,
    /// Heading in degrees, counter-clockwise with the screen y axis pointing down.
    pub heading: f64,
}

/// An immutable grid of classified cells.
///
/// Any query outside of the grid is [off](Cell::Off).
#[derive(Debug, Clone)]
pub struct TrackMap {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl TrackMap {
    /// Builds a track directly from row-major cells.
    pub fn from_cells(width: usize, height: usize, cells: Vec<Cell>) -> Result<Self, TrackError> {
        if cells.len() != width * height {
            return Err(TrackError::GridSize {
                expected: width * height,
                got: cells.len(),
            });
        }
        Ok(TrackMap {
            width,
            height,
            cells,
        })
    }

    /// Classifies every pixel of a raster.
    ///
    /// The raster is scaled to `size` first with nearest-neighbour sampling, which keeps the
    /// reserved colors exact.
    pub fn from_image(image: &RgbImage, palette: &TrackPalette, size: (u32, u32)) -> Self {
        let scaled;
        let image = if image.dimensions() == size {
            image
        } else {
            scaled = imageops::resize(image, size.0, size.1, imageops::FilterType::Nearest);
            &scaled
        };
        let cells = image.pixels().map(|p| palette.classify(p.0)).collect();
        TrackMap {
            width: size.0 as usize,
            height: size.1 as usize,
            cells,
        }
    }

    /// Loads and classifies a raster from disk.
    pub fn open<P: AsRef<Path>>(
        path: P,
        palette: &TrackPalette,
        size: (u32, u32),
    ) -> Result<Self, TrackError> {
        let image = image::open(path)?.to_rgb8();
        Ok(Self::from_image(&image, palette, size))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Classifies an integer cell.
    pub fn cell(&self, x: i64, y: i64) -> Cell {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return Cell::Off;
        }
        self.cells[y as usize * self.width + x as usize]
    }

    /// Classifies a point in world coordinates.
    pub fn classify(&self, x: f64, y: f64) -> Cell {
        if !(x >= 0.0 && y >= 0.0 && x < self.width as f64 && y < self.height as f64) {
            return Cell::Off;
        }
        self.cell(x as i64, y as i64)
    }

    /// Whether a point lies on road, checkpoint or start line.
    pub fn is_on_track(&self, x: f64, y: f64) -> bool {
        self.classify(x, y).on_track()
    }

    /// Finds the first start line pixel in row-major order and the direction of the road
    /// next to it.
    ///
    /// Neighbours are checked left, right, up, then down.
    pub fn find_start(&self) -> Result<StartPose, TrackError> {
        let index = self
            .cells
            .iter()
            .position(|c| *c == Cell::StartLine)
            .ok_or(TrackError::NoStartLine)?;
        let (x, y) = (index % self.width, index / self.width);

        [(-1, 0), (1, 0), (0, -1), (0, 1)]
            .iter()
            .find(|(dx, dy)| self.cell(x as i64 + dx, y as i64 + dy) == Cell::Road)
            .map(|&(dx, dy)| StartPose {
                x: x as f64,
                y: y as f64,
                heading: f64::atan2(-dy as f64, dx as f64).to_degrees(),
            })
            .ok_or(TrackError::StartLineIsolated { x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb as Pixel;

    fn grid(rows: &[&str]) -> TrackMap {
        let cells = rows
            .iter()
            .flat_map(|r| r.chars())
            .map(|c| match c {
                '#' => Cell::Road,
                'C' => Cell::Checkpoint,
                'S' => Cell::StartLine,
                _ => Cell::Off,
            })
            .collect();
        TrackMap::from_cells(rows[0].len(), rows.len(), cells).unwrap()
    }

    #[test]
    fn out_of_bounds_is_off() {
        let track = grid(&["###", "###"]);
        for &(x, y) in &[(-0.1, 0.0), (0.0, -1.0), (3.0, 1.0), (1.0, 2.0), (1e9, -1e9)] {
            assert_eq!(track.classify(x, y), Cell::Off);
        }
        assert_eq!(track.classify(f64::NAN, 0.0), Cell::Off);
        assert_eq!(track.cell(-1, 0), Cell::Off);
        assert_eq!(track.classify(2.9, 1.9), Cell::Road);
    }

    #[test]
    fn palette_matches_exact_colors() {
        let palette = TrackPalette {
            road: [10, 10, 10],
            ..TrackPalette::default()
        };
        assert_eq!(palette.classify([10, 10, 10]), Cell::Road);
        assert_eq!(palette.classify(BLACK), Cell::Road);
        assert_eq!(palette.classify([128, 128, 128]), Cell::Checkpoint);
        assert_eq!(palette.classify([255, 255, 0]), Cell::StartLine);
        assert_eq!(palette.classify([255, 255, 255]), Cell::Off);
        assert_eq!(palette.classify([128, 128, 129]), Cell::Off);
    }

    #[test]
    fn image_is_scaled_to_world() {
        let image = RgbImage::from_fn(2, 2, |x, _| {
            if x == 0 {
                Pixel([0, 0, 0])
            } else {
                Pixel([255, 255, 255])
            }
        });
        let track = TrackMap::from_image(&image, &TrackPalette::default(), (4, 4));
        assert_eq!(track.width(), 4);
        assert_eq!(track.classify(0.5, 3.5), Cell::Road);
        assert_eq!(track.classify(3.5, 0.5), Cell::Off);
    }

    #[test]
    fn start_faces_adjacent_road() {
        let track = grid(&["....", ".S##", "...."]);
        let start = track.find_start().unwrap();
        assert_eq!((start.x, start.y), (1.0, 1.0));
        assert!(start.heading.abs() < 1e-9);

        // Road below the start line points down the screen.
        let track = grid(&[".S.", ".#."]);
        assert!((track.find_start().unwrap().heading + 90.0).abs() < 1e-9);
    }

    #[test]
    fn start_failures() {
        assert!(matches!(
            grid(&["###"]).find_start(),
            Err(TrackError::NoStartLine)
        ));
        assert!(matches!(
            grid(&["..S", "..C"]).find_start(),
            Err(TrackError::StartLineIsolated { x: 2, y: 0 })
        ));
    }

    #[test]
    fn mismatched_grid_is_rejected() {
        assert!(TrackMap::from_cells(2, 2, vec![Cell::Road; 3]).is_err());
    }
}
