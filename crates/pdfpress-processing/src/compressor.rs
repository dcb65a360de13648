//! PDF compressor - runs Ghostscript against a file pair

use async_trait::async_trait;
use bytes::Bytes;
use pdfpress_core::CompressionSettings;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Longest stderr excerpt kept for debug logs
const STDERR_LOG_LIMIT: usize = 2048;

#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("compressor exited with status {code:?}")]
    ExitStatus { code: Option<i32>, stderr: String },

    #[error("compressor timed out after {0:?}")]
    Timeout(Duration),

    #[error("compressor reported success but produced no output file")]
    MissingOutput,

    #[error("failed to read compressed output: {0}")]
    ReadOutput(#[source] io::Error),
}

/// Anything that can turn an input PDF into a compressed output PDF.
#[async_trait]
pub trait PdfCompressor: Send + Sync {
    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        settings: &CompressionSettings,
    ) -> Result<(), CompressionError>;

    fn name(&self) -> &'static str;
}

/// Ghostscript JPEG quantisation factor for a 0-100 quality score.
///
/// 100 maps to 0.1 (finest), 0 maps to 1.0 (coarsest).
pub fn qfactor_for_quality(quality: u8) -> f64 {
    let quality = f64::from(quality.min(100));
    (100.0 - quality) / 100.0 * 0.9 + 0.1
}

pub struct GhostscriptCompressor {
    gs_path: String,
    timeout: Duration,
}

impl GhostscriptCompressor {
    pub fn new(gs_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            gs_path: gs_path.into(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full argument list for one run
    pub fn build_args(input: &Path, output: &Path, settings: &CompressionSettings) -> Vec<String> {
        let mut args: Vec<String> = [
            "-sDEVICE=pdfwrite",
            "-dCompatibilityLevel=1.4",
            "-dNOPAUSE",
            "-dQUIET",
            "-dBATCH",
            "-dSAFER",
            "-dAutoFilterColorImages=false",
            "-dAutoFilterGrayImages=false",
            "-dColorImageFilter=/DCTEncode",
            "-dGrayImageFilter=/DCTEncode",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        if let Some(dpi) = settings.target_dpi() {
            for kind in ["Color", "Gray", "Mono"] {
                args.push(format!("-dDownsample{}Images=true", kind));
                args.push(format!("-d{}ImageResolution={}", kind, dpi));
                args.push(format!("-d{}ImageDownsampleType=/Bicubic", kind));
            }
        }

        let qfactor = qfactor_for_quality(settings.quality_score());
        let image_dict = format!(
            "<< /QFactor {:.3} /Blend 1 /HSamples [2 1 1 2] /VSamples [2 1 1 2] >>",
            qfactor
        );

        args.push(format!("-sOutputFile={}", output.display()));
        args.push("-c".to_string());
        args.push(format!(
            "<< /ColorImageDict {} /GrayImageDict {} >> setdistillerparams",
            image_dict, image_dict
        ));
        args.push("-f".to_string());
        args.push(input.to_string_lossy().to_string());
        args
    }
}

#[async_trait]
impl PdfCompressor for GhostscriptCompressor {
    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        settings: &CompressionSettings,
    ) -> Result<(), CompressionError> {
        let args = Self::build_args(input, output, settings);
        let started = Instant::now();

        // The child is killed if the timeout drops the future
        let run = Command::new(&self.gs_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let result = match tokio::time::timeout(self.timeout, run).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "Ghostscript timed out, process killed"
                );
                return Err(CompressionError::Timeout(self.timeout));
            }
        };

        let output_status = result.map_err(|source| CompressionError::Launch {
            program: self.gs_path.clone(),
            source,
        })?;

        if !output_status.status.success() {
            let stderr = String::from_utf8_lossy(&output_status.stderr);
            let stderr: String = stderr.chars().take(STDERR_LOG_LIMIT).collect();
            tracing::debug!(
                code = ?output_status.status.code(),
                stderr = %stderr,
                "Ghostscript failed"
            );
            return Err(CompressionError::ExitStatus {
                code: output_status.status.code(),
                stderr,
            });
        }

        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            resolution = %settings.resolution,
            quality = %settings.quality,
            "Ghostscript finished"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ghostscript"
    }
}

/// Compressed document held in memory
#[derive(Debug, Clone)]
pub struct CompressedPdf {
    pub size: u64,
    pub data: Bytes,
}

/// Run `compressor` and load its output.
///
/// A successful run that leaves no output file is reported as
/// [`CompressionError::MissingOutput`].
pub async fn compress_to_memory(
    compressor: &dyn PdfCompressor,
    input: &Path,
    output: &Path,
    settings: &CompressionSettings,
) -> Result<CompressedPdf, CompressionError> {
    compressor.compress(input, output, settings).await?;

    let data = match tokio::fs::read(output).await {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CompressionError::MissingOutput)
        }
        Err(e) => return Err(CompressionError::ReadOutput(e)),
    };

    Ok(CompressedPdf {
        size: data.len() as u64,
        data: Bytes::from(data),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfpress_core::{QualityPreset, ResolutionPreset};

    fn settings(resolution: ResolutionPreset, quality: QualityPreset) -> CompressionSettings {
        CompressionSettings::new(resolution, quality)
    }

    #[test]
    fn test_qfactor_formula() {
        assert!((qfactor_for_quality(100) - 0.1).abs() < 1e-9);
        assert!((qfactor_for_quality(0) - 1.0).abs() < 1e-9);
        assert!((qfactor_for_quality(90) - 0.19).abs() < 1e-9);
        assert!((qfactor_for_quality(80) - 0.28).abs() < 1e-9);
        // Out-of-range scores are clamped
        assert!((qfactor_for_quality(200) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_qfactor_monotonically_decreasing() {
        let mut previous = f64::MAX;
        for q in 0..=100u8 {
            let current = qfactor_for_quality(q);
            assert!(current < previous);
            previous = current;
        }
    }

    #[test]
    fn test_args_without_downsampling() {
        let args = GhostscriptCompressor::build_args(
            Path::new("/tmp/in.pdf"),
            Path::new("/tmp/out.pdf"),
            &settings(ResolutionPreset::Unchanged, QualityPreset::High),
        );
        assert_eq!(args[0], "-sDEVICE=pdfwrite");
        assert!(args.contains(&"-dSAFER".to_string()));
        assert!(args.contains(&"-dColorImageFilter=/DCTEncode".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("-dDownsample")));
        assert!(args.contains(&"-sOutputFile=/tmp/out.pdf".to_string()));

        let n = args.len();
        assert_eq!(args[n - 2], "-f");
        assert_eq!(args[n - 1], "/tmp/in.pdf");
        assert_eq!(args[n - 4], "-c");
        assert!(args[n - 3].contains("/QFactor 0.280"));
        assert!(args[n - 3].ends_with("setdistillerparams"));
    }

    #[test]
    fn test_args_with_downsampling() {
        let args = GhostscriptCompressor::build_args(
            Path::new("in.pdf"),
            Path::new("out.pdf"),
            &settings(ResolutionPreset::Screen, QualityPreset::Medium),
        );
        for kind in ["Color", "Gray", "Mono"] {
            assert!(args.contains(&format!("-dDownsample{}Images=true", kind)));
            assert!(args.contains(&format!("-d{}ImageResolution=72", kind)));
            assert!(args.contains(&format!("-d{}ImageDownsampleType=/Bicubic", kind)));
        }
        let distiller = args.iter().find(|a| a.contains("setdistillerparams"));
        assert!(distiller.is_some_and(|d| d.contains("/QFactor 0.460")));
        // Downsampling options precede the output file
        let downsample_pos = args
            .iter()
            .position(|a| a == "-dDownsampleColorImages=true");
        let output_pos = args.iter().position(|a| a.starts_with("-sOutputFile="));
        assert!(downsample_pos < output_pos);
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        const ETXTBSY: i32 = 26;

        fn write_script(dir: &TempDir, name: &str, body: &str) -> String {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write script");
            let mut perms = std::fs::metadata(&path).expect("metadata").permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).expect("chmod");
            path.to_string_lossy().to_string()
        }

        /// Freshly written scripts can briefly fail with ETXTBSY while another
        /// test thread is forking.
        async fn run(
            compressor: &GhostscriptCompressor,
            input: &Path,
            output: &Path,
        ) -> Result<(), CompressionError> {
            let settings = CompressionSettings::default();
            for _ in 0..10 {
                match compressor.compress(input, output, &settings).await {
                    Err(CompressionError::Launch { source, .. })
                        if source.raw_os_error() == Some(ETXTBSY) =>
                    {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                    }
                    other => return other,
                }
            }
            compressor.compress(input, output, &settings).await
        }

        #[tokio::test]
        async fn test_launch_failure() {
            let compressor = GhostscriptCompressor::new(
                "/nonexistent/pdfpress-gs",
                Duration::from_secs(5),
            );
            let err = compressor
                .compress(
                    Path::new("in.pdf"),
                    Path::new("out.pdf"),
                    &CompressionSettings::default(),
                )
                .await
                .expect_err("launch should fail");
            assert!(matches!(err, CompressionError::Launch { .. }));
        }

        #[tokio::test]
        async fn test_nonzero_exit() {
            let dir = tempfile::tempdir().expect("tempdir");
            let script = write_script(&dir, "fail.sh", "echo 'Error: /undefined' >&2\nexit 3");
            let compressor = GhostscriptCompressor::new(script, Duration::from_secs(5));

            let err = run(&compressor, Path::new("in.pdf"), Path::new("out.pdf"))
                .await
                .expect_err("should fail");
            match err {
                CompressionError::ExitStatus { code, stderr } => {
                    assert_eq!(code, Some(3));
                    assert!(stderr.contains("undefined"));
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_timeout_kills_process() {
            let dir = tempfile::tempdir().expect("tempdir");
            let script = write_script(&dir, "slow.sh", "sleep 10");
            let compressor = GhostscriptCompressor::new(script, Duration::from_millis(200));

            let started = Instant::now();
            let err = run(&compressor, Path::new("in.pdf"), Path::new("out.pdf"))
                .await
                .expect_err("should time out");
            assert!(matches!(err, CompressionError::Timeout(_)));
            assert!(started.elapsed() < Duration::from_secs(5));
        }

        #[tokio::test]
        async fn test_success_without_output_is_missing_output() {
            let dir = tempfile::tempdir().expect("tempdir");
            let script = write_script(&dir, "noop.sh", "exit 0");
            let compressor = GhostscriptCompressor::new(script, Duration::from_secs(5));
            let output = dir.path().join("out.pdf");

            run(&compressor, Path::new("in.pdf"), &output)
                .await
                .expect("noop succeeds");
            let err = compress_to_memory(
                &compressor,
                Path::new("in.pdf"),
                &output,
                &CompressionSettings::default(),
            )
            .await
            .expect_err("no output");
            assert!(matches!(err, CompressionError::MissingOutput));
        }

        #[tokio::test]
        async fn test_output_file_and_input_argument_contract() {
            let dir = tempfile::tempdir().expect("tempdir");
            // Copies the file after -f to the -sOutputFile target
            let script = write_script(
                &dir,
                "copy.sh",
                r#"out=""; prev=""; in=""
for arg in "$@"; do
  case "$arg" in -sOutputFile=*) out="${arg#-sOutputFile=}";; esac
  if [ "$prev" = "-f" ]; then in="$arg"; fi
  prev="$arg"
done
cp "$in" "$out""#,
            );
            let compressor = GhostscriptCompressor::new(script, Duration::from_secs(5));
            let input = dir.path().join("job_input.pdf");
            let output = dir.path().join("job_output.pdf");
            std::fs::write(&input, b"%PDF-1.4\nbody\n%%EOF\n").expect("write input");

            run(&compressor, &input, &output).await.expect("copy succeeds");
            let compressed = compress_to_memory(
                &compressor,
                &input,
                &output,
                &CompressionSettings::default(),
            )
            .await
            .expect("compressed");
            assert_eq!(compressed.size, 20);
            assert!(compressed.data.starts_with(b"%PDF-"));
        }
    }
}
