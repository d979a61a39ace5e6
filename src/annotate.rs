use crate::detection::Detection;
use opencv::{
    core::{Point, Rect, Scalar, Vector},
    imgcodecs, imgproc,
    prelude::*,
};
use std::path::Path;
use thiserror::Error;

const BOX_THICKNESS: i32 = 3;
const LABEL_SCALE: f64 = 0.5;
// Label sits just inside the box corner, lifted above the outline.
const LABEL_OFFSET_X: i32 = 2;
const LABEL_OFFSET_Y: i32 = -20;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("failed to read image: {0}")]
    ReadFailed(opencv::Error),
    #[error("could not decode image at {0}")]
    Decode(String),
    #[error("failed to write annotated image: {0}")]
    WriteFailed(opencv::Error),
    #[error("encoder rejected {0}")]
    Encode(String),
    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),
}

pub struct CvImage {
    mat: Mat,
}

impl CvImage {
    pub fn open(path: &Path) -> Result<Self, AnnotateError> {
        let mat = imgcodecs::imread(&path.to_string_lossy(), imgcodecs::IMREAD_COLOR)
            .map_err(AnnotateError::ReadFailed)?;
        if mat.empty() {
            return Err(AnnotateError::Decode(path.display().to_string()));
        }
        Ok(Self { mat })
    }

    /// Burns each detection box and its label into the image.
    pub fn annotate(&mut self, detections: &[Detection]) -> Result<&mut Self, AnnotateError> {
        for det in detections {
            let ((x0, y0), (x1, y1)) = det.corners();
            let rect = Rect::new(
                x0 as i32,
                y0 as i32,
                (x1 - x0) as i32,
                (y1 - y0) as i32,
            );

            // BGR: red outline, cyan label
            imgproc::rectangle(
                &mut self.mat,
                rect,
                Scalar::new(0.0, 0.0, 255.0, 0.0),
                BOX_THICKNESS,
                imgproc::LINE_8,
                0,
            )?;

            imgproc::put_text(
                &mut self.mat,
                &det.label(),
                Point::new(x0 as i32 + LABEL_OFFSET_X, y0 as i32 + LABEL_OFFSET_Y),
                imgproc::FONT_HERSHEY_SIMPLEX,
                LABEL_SCALE,
                Scalar::new(255.0, 255.0, 0.0, 0.0),
                1,
                imgproc::LINE_AA,
                false,
            )?;
        }
        Ok(self)
    }

    /// Encodes by the extension of `path`, matching the uploaded format.
    pub fn save(&self, path: &Path) -> Result<(), AnnotateError> {
        let written = imgcodecs::imwrite(&path.to_string_lossy(), &self.mat, &Vector::new())
            .map_err(AnnotateError::WriteFailed)?;
        if !written {
            return Err(AnnotateError::Encode(path.display().to_string()));
        }
        Ok(())
    }
}
