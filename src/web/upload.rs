//! Reading the upload form.

use std::io::Cursor;

use axum::extract::multipart::Field;

use crate::pipeline::{AnalysisMode, PortraitStyle};
use crate::web::prelude::*;

/// The fields of the proclaim form. Nothing here has been validated as an image yet.
#[derive(Debug, Default)]
pub(crate) struct ProclaimForm {
    pub(crate) image: Option<Vec<u8>>,
    pub(crate) name: String,
    pub(crate) analysis: AnalysisMode,
    pub(crate) style: PortraitStyle,
}

async fn field_text(field: Field<'_>) -> Result<String, HeraldryError> {
    field.text().await.map_err(|err| {
        debug!("Failed to read form field: {}", err);
        HeraldryError::BadRequest
    })
}

pub(crate) async fn read_form(mut multipart: Multipart) -> Result<ProclaimForm, HeraldryError> {
    let mut form = ProclaimForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        debug!("Failed to read multipart body: {}", err);
        HeraldryError::BadRequest
    })? {
        let field_name = field.name().unwrap_or_default();
        match field_name {
            "image" => {
                let bytes = field.bytes().await.map_err(|err| {
                    debug!("Failed to read image upload: {}", err);
                    HeraldryError::BadRequest
                })?;
                // browsers send an empty part when no file was chosen
                if !bytes.is_empty() {
                    form.image = Some(bytes.to_vec());
                }
            }
            "name" => form.name = field_text(field).await?,
            "analysis" => form.analysis = field_text(field).await?.parse()?,
            "portrait" => form.style = field_text(field).await?.parse()?,
            _ => {}
        }
    }

    Ok(form)
}

/// Re-encodes an upload as an RGB JPEG, JPEG uploads pass through untouched.
pub(crate) fn normalize_image_to_jpeg(bytes: &[u8]) -> Result<Vec<u8>, HeraldryError> {
    if bytes.len() < 4 {
        debug!("Image is too short");
        return Err(HeraldryError::BadRequest);
    }

    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| {
            debug!("Failed to guess image format: {}", err);
            HeraldryError::BadRequest
        })?;
    let format = reader.format();
    let image = reader.decode().map_err(|err| {
        debug!("Failed to decode image: {}", err);
        HeraldryError::BadRequest
    })?;

    if format == Some(image::ImageFormat::Jpeg) {
        return Ok(bytes.to_vec());
    }

    let mut output = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new(&mut output);
    encoder.encode_image(&image.to_rgb8())?;
    Ok(output)
}
