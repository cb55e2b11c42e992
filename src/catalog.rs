//! Built-in tool configurations.
//!
//! One entry per backend route. Field names, accepted types, size ceilings,
//! output names and timeouts follow what the backend expects; everything
//! else is shared by [`crate::workflow::FileTransformWorkflow`].

use crate::config::ClientConfig;
use crate::error::WorkflowError;
use crate::file::FileConstraints;
use crate::params::{ParamKind, ParamSpec};
use crate::tool::{FileSlot, ResponseKind, ToolSpec};

// ── MIME sets ────────────────────────────────────────────────────────────────

pub const PDF: &[&str] = &["application/pdf"];

pub const IMAGES: &[&str] = &["image/jpeg", "image/png"];

pub const PDF_OR_IMAGE: &[&str] = &["application/pdf", "image/jpeg", "image/png"];

pub const OCR_INPUTS: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/png",
    "image/tiff",
    "image/bmp",
];

pub const WORD: &[&str] = &[
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

pub const EXCEL: &[&str] = &[
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

pub const POWERPOINT: &[&str] = &[
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
];

/// Inputs of the generic `/convert` route.
pub const CONVERT_INPUTS: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/png",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "text/html",
    "text/plain",
    "text/csv",
];

pub const CONVERT_TARGETS: &[&str] = &["docx", "xlsx", "pptx", "jpg", "pdf"];

pub const CERTIFICATE: &[&str] = &["application/x-pkcs12", "application/pkcs12"];

pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const PPTX_MIME: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Compression accepts larger inputs than the other tools.
pub const COMPRESS_MAX_BYTES: u64 = 100 * 1024 * 1024;

/// Upper bound for merge / image-to-PDF selections.
const MAX_BATCH: usize = 50;

/// Every built-in tool, using `config` for the shared size ceiling.
pub fn all(config: &ClientConfig) -> Result<Vec<ToolSpec>, WorkflowError> {
    let max = config.default_max_file_bytes;
    let pdf = || FileSlot::new("file", "PDF file", FileConstraints::single(PDF, max));
    let pages = || ParamSpec::required("pages", ParamKind::PageList);
    let password = || ParamSpec::required("password", ParamKind::Secret);

    Ok(vec![
        // ── Organise ─────────────────────────────────────────────────────
        ToolSpec::builder("merge", "/merge")
            .label("Merge PDF")
            .slot(FileSlot::new(
                "files",
                "PDF files",
                FileConstraints::multiple(PDF, max, 2, MAX_BATCH),
            ))
            .output_name("merged.pdf")
            .failure_message("Failed to merge PDFs. Please try again.")
            .build()?,
        ToolSpec::builder("split", "/split")
            .label("Split PDF")
            .slot(pdf())
            .param(ParamSpec::required("pages", ParamKind::PageRange))
            .output_name("split_{stem}.pdf")
            .failure_message("Failed to split PDF. Please try again.")
            .timeout_secs(30)
            .build()?,
        ToolSpec::builder("remove-pages", "/remove-pages")
            .label("Remove Pages")
            .slot(pdf())
            .param(pages())
            .output_name("removed_pages.pdf")
            .failure_message("Failed to remove pages. Please try again.")
            .build()?,
        ToolSpec::builder("extract-pages", "/extract-pages")
            .label("Extract Pages")
            .slot(pdf())
            .param(pages())
            .output_name("extracted_{stem}.pdf")
            .failure_message("Failed to extract pages. Please try again.")
            .build()?,
        ToolSpec::builder("rotate", "/rotate")
            .label("Rotate PDF")
            .slot(pdf())
            .param(pages())
            .param(ParamSpec::required(
                "angle",
                ParamKind::Choice(vec!["90".into(), "180".into(), "270".into()]),
            ))
            .output_name("rotated_{stem}.pdf")
            .failure_message("Failed to rotate PDF. Please try again.")
            .build()?,
        ToolSpec::builder("organize", "/organize-pdf")
            .label("Organize PDF")
            .slot(pdf())
            .param(ParamSpec::required("pageOrder", ParamKind::PageList))
            .output_name("organized.pdf")
            .failure_message("Failed to organize PDF. Please try again.")
            .build()?,
        // ── Edit ─────────────────────────────────────────────────────────
        ToolSpec::builder("edit", "/edit-pdf")
            .label("Edit PDF")
            .slot(pdf())
            .slot(
                FileSlot::new("image", "Image to place", FileConstraints::single(IMAGES, max))
                    .optional(),
            )
            // {"addText": .., "rotate": .., "watermark": .., "pageNumbers": ..}
            .param(ParamSpec::required("options", ParamKind::JsonObject))
            .output_name("edited.pdf")
            .failure_message("Failed to edit PDF. Please try again.")
            .build()?,
        // ── Optimise ─────────────────────────────────────────────────────
        ToolSpec::builder("compress", "/compress")
            .label("Compress PDF")
            .slot(FileSlot::new(
                "file",
                "PDF file",
                FileConstraints::single(PDF, COMPRESS_MAX_BYTES),
            ))
            .output_name("compressed_{stem}.pdf")
            .failure_message("Compression failed. Please try again.")
            .timeout_secs(120)
            .build()?,
        ToolSpec::builder("optimize", "/optimize")
            .label("Optimize PDF")
            .slot(pdf())
            .output_name("optimized_{stem}.pdf")
            .failure_message("Optimization failed. Please try again.")
            .timeout_secs(120)
            .build()?,
        ToolSpec::builder("repair", "/repair-pdf")
            .label("Repair PDF")
            .slot(pdf())
            .output_name("repaired_{stem}.pdf")
            .failure_message("Failed to repair PDF. Please try again.")
            .build()?,
        ToolSpec::builder("ocr", "/ocr-pdf")
            .label("OCR PDF")
            .slot(FileSlot::new(
                "file",
                "PDF or image",
                FileConstraints::single(OCR_INPUTS, max),
            ))
            .response(ResponseKind::Text)
            .output_name("{stem}.txt")
            .failure_message("Failed to process OCR. Please try again.")
            .timeout_secs(180)
            .build()?,
        // ── Edit ─────────────────────────────────────────────────────────
        ToolSpec::builder("watermark", "/watermark")
            .label("Add Watermark")
            .slot(pdf())
            .slot(FileSlot::new(
                "watermark",
                "Watermark (PDF or image)",
                FileConstraints::single(PDF_OR_IMAGE, max),
            ))
            .output_name("watermarked_{stem}.pdf")
            .failure_message("Failed to add watermark. Please try again.")
            .build()?,
        ToolSpec::builder("page-numbers", "/page-numbers")
            .label("Add Page Numbers")
            .slot(pdf())
            .param(
                ParamSpec::optional(
                    "position",
                    ParamKind::Choice(
                        [
                            "top-left",
                            "top-center",
                            "top-right",
                            "bottom-left",
                            "bottom-center",
                            "bottom-right",
                        ]
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                    ),
                )
                .default_value("bottom-right"),
            )
            .param(ParamSpec::optional("font_size", ParamKind::Integer { min: 6, max: 72 }).default_value("12"))
            .param(ParamSpec::optional("start_page", ParamKind::Integer { min: 1, max: 100_000 }).default_value("1"))
            .param(ParamSpec::optional("number_format", ParamKind::Text).default_value("1"))
            .output_name("numbered_{stem}.pdf")
            .failure_message("Failed to add page numbers. Please try again.")
            .build()?,
        ToolSpec::builder("crop", "/crop-pdf")
            .label("Crop PDF")
            .slot(pdf())
            .param(ParamSpec::required("cropBox", ParamKind::CropBox))
            .output_name("cropped_{stem}.pdf")
            .failure_message("Failed to crop PDF. Please try again.")
            .build()?,
        ToolSpec::builder("crop-image", "/crop-image")
            .label("Crop Image")
            .slot(FileSlot::new("file", "Image", FileConstraints::single(IMAGES, max)))
            .param(ParamSpec::optional("left", ParamKind::Integer { min: 0, max: 100_000 }).default_value("0"))
            .param(ParamSpec::optional("top", ParamKind::Integer { min: 0, max: 100_000 }).default_value("0"))
            .param(ParamSpec::optional("right", ParamKind::Integer { min: 1, max: 100_000 }).default_value("300"))
            .param(ParamSpec::optional("bottom", ParamKind::Integer { min: 1, max: 100_000 }).default_value("300"))
            .response(ResponseKind::blob("image/png"))
            .output_name("cropped_{stem}.png")
            .failure_message("Failed to crop image. Please try again.")
            .build()?,
        ToolSpec::builder("redact", "/redact-pdf")
            .label("Redact PDF")
            .slot(pdf())
            .param(ParamSpec::required("keywords", ParamKind::Keywords))
            .output_name("redacted.pdf")
            .failure_message("Failed to redact PDF. Please try again.")
            .build()?,
        // ── Security ─────────────────────────────────────────────────────
        ToolSpec::builder("lock", "/encrypt-pdf")
            .label("Lock PDF")
            .slot(pdf())
            .param(password())
            .output_name("encrypted_{stem}.pdf")
            .failure_message("Failed to encrypt PDF.")
            .build()?,
        ToolSpec::builder("unlock", "/decrypt-pdf")
            .label("Unlock PDF")
            .slot(pdf())
            .param(password())
            .output_name("decrypted_{stem}.pdf")
            .failure_message("Failed to decrypt PDF.")
            .build()?,
        ToolSpec::builder("remove-password", "/unlock-pdf")
            .label("Remove PDF Password")
            .slot(pdf())
            .param(password())
            .output_name("unlocked_{stem}.pdf")
            .failure_message("Failed to unlock PDF.")
            .build()?,
        ToolSpec::builder("sign", "/sign-pdf")
            .label("Sign PDF")
            .slot(pdf())
            .output_name("signed.pdf")
            .failure_message("Failed to sign PDF. Please try again.")
            .build()?,
        ToolSpec::builder("sign-cert", "/sign-with-cert")
            .label("Sign PDF with Certificate")
            .slot(pdf())
            .slot(FileSlot::new(
                "cert",
                "Certificate (.pfx/.p12)",
                FileConstraints::single(CERTIFICATE, max),
            ))
            .param(ParamSpec::with_slot("password", ParamKind::Secret, "cert"))
            .output_name("signed.pdf")
            .failure_message("Failed to sign PDF. Please try again.")
            .build()?,
        ToolSpec::builder("compare", "/compare-pdf")
            .label("Compare PDF")
            .slot(FileSlot::new("file1", "First PDF", FileConstraints::single(PDF, max)))
            .slot(FileSlot::new("file2", "Second PDF", FileConstraints::single(PDF, max)))
            .response(ResponseKind::Json)
            .output_name("comparison.json")
            .failure_message("Failed to compare PDFs. Please try again.")
            .build()?,
        // ── Convert from PDF ─────────────────────────────────────────────
        ToolSpec::builder("pdf-to-word", "/pdf-to-word")
            .label("PDF to Word")
            .slot(pdf())
            .response(ResponseKind::blob(DOCX_MIME))
            .output_name("{stem}.docx")
            .failure_message("Failed to convert PDF to Word. Please try again.")
            .timeout_secs(120)
            .build()?,
        ToolSpec::builder("pdf-to-excel", "/pdf-to-excel")
            .label("PDF to Excel")
            .slot(pdf())
            .response(ResponseKind::blob(XLSX_MIME))
            .output_name("converted_{stem}.xlsx")
            .failure_message("Failed to convert PDF to Excel. Please try again.")
            .timeout_secs(120)
            .build()?,
        ToolSpec::builder("pdf-to-pptx", "/pdf-to-pptx")
            .label("PDF to PowerPoint")
            .slot(pdf())
            .response(ResponseKind::blob(PPTX_MIME))
            .output_name("{stem}.pptx")
            .failure_message("Failed to convert PDF to PowerPoint. Please try again.")
            .timeout_secs(120)
            .build()?,
        ToolSpec::builder("pdf-to-jpg", "/pdf-to-images")
            .label("PDF to JPG")
            .slot(pdf())
            .response(ResponseKind::blob("application/zip"))
            .output_name("pdf_images.zip")
            .failure_message("Failed to convert PDF to images. Please try again.")
            .timeout_secs(120)
            .build()?,
        // ── Convert to PDF ───────────────────────────────────────────────
        ToolSpec::builder("word-to-pdf", "/word-to-pdf")
            .label("Word to PDF")
            .slot(FileSlot::new("file", "Word document", FileConstraints::single(WORD, max)))
            .output_name("{stem}.pdf")
            .failure_message("Failed to convert Word to PDF. Please try again.")
            .timeout_secs(120)
            .build()?,
        ToolSpec::builder("excel-to-pdf", "/excel-to-pdf")
            .label("Excel to PDF")
            .slot(FileSlot::new("file", "Excel workbook", FileConstraints::single(EXCEL, max)))
            .output_name("{stem}.pdf")
            .failure_message("Failed to convert Excel to PDF. Please try again.")
            .timeout_secs(120)
            .build()?,
        ToolSpec::builder("pptx-to-pdf", "/pptx-to-pdf")
            .label("PowerPoint to PDF")
            .slot(FileSlot::new(
                "file",
                "PowerPoint presentation",
                FileConstraints::single(POWERPOINT, max),
            ))
            .output_name("{stem}.pdf")
            .failure_message("Failed to convert PowerPoint to PDF. Please try again.")
            .timeout_secs(120)
            .build()?,
        ToolSpec::builder("jpg-to-pdf", "/jpg-to-pdf")
            .label("JPG to PDF")
            .slot(FileSlot::new(
                "files",
                "Images",
                FileConstraints::multiple(IMAGES, max, 1, MAX_BATCH),
            ))
            .output_name("converted.pdf")
            .failure_message("Failed to convert images to PDF. Please try again.")
            .build()?,
        ToolSpec::builder("convert", "/convert")
            .label("Convert File")
            .slot(FileSlot::new(
                "file",
                "File",
                FileConstraints::single(CONVERT_INPUTS, max),
            ))
            .param(ParamSpec::required(
                "target_format",
                ParamKind::Choice(CONVERT_TARGETS.iter().map(|t| t.to_string()).collect()),
            ))
            .response(ResponseKind::blob(crate::file::OCTET_STREAM))
            .output_name("converted_{stem}.{target_format}")
            .failure_message("Conversion failed. Please try again.")
            .timeout_secs(120)
            .build()?,
        ToolSpec::builder("html-to-pdf", "/html-to-pdf")
            .label("HTML to PDF")
            .param(ParamSpec::optional("url", ParamKind::Url))
            .param(ParamSpec::optional("html", ParamKind::Text))
            .one_of(&["url", "html"])
            .output_name("converted.pdf")
            .failure_message("Failed to convert HTML to PDF. Please try again.")
            .timeout_secs(120)
            .build()?,
    ])
}

/// Look up a built-in tool by id.
pub fn find(id: &str, config: &ClientConfig) -> Result<ToolSpec, WorkflowError> {
    all(config)?
        .into_iter()
        .find(|t| t.id == id)
        .ok_or_else(|| WorkflowError::UnknownTool(id.to_string()))
}
