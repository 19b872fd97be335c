//! End-to-end extraction over in-memory archives.

mod common;

use common::{DEFAULT_MTIME, TarBuilder, bzip2, gzip, header, lzma, run};
use filetime::FileTime;
use std::error::Error;
use std::fs;
use std::io::Cursor;
use untgz_archive::{
    CompressionTag, ExtractOptions, KeepPolicy, StripUnsafePrefix, extract, extract_path,
};
use untgz_core::{BLOCK_SIZE, ExtractionOutcome, UntgzError};

type TestResult = Result<(), Box<dyn Error>>;

fn mtime_of(path: &std::path::Path) -> Result<i64, Box<dyn Error>> {
    Ok(FileTime::from_last_modification_time(&fs::metadata(path)?).unix_seconds())
}

#[test]
fn test_plain_tar_round_trip() -> TestResult {
    let dir = tempfile::tempdir()?;
    let big: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
    let archive = TarBuilder::new()
        .file("hello.txt", b"hello world\n")
        .file("data/blob.bin", &big)
        .file("empty", b"")
        .finish();

    let options = ExtractOptions::new().destination(dir.path());
    let (result, lines) = run(&archive, &options);
    let stats = result?;

    assert_eq!(stats.written, 3);
    assert_eq!(fs::read(dir.path().join("hello.txt"))?, b"hello world\n");
    assert_eq!(fs::read(dir.path().join("data").join("blob.bin"))?, big);
    assert_eq!(fs::read(dir.path().join("empty"))?.len(), 0);
    assert_eq!(
        lines,
        vec!["Writing hello.txt", "Writing data/blob.bin", "Writing empty"]
    );
    assert_eq!(mtime_of(&dir.path().join("hello.txt"))?, DEFAULT_MTIME as i64);
    Ok(())
}

#[test]
fn test_gzip_bzip2_and_lzma_containers() -> TestResult {
    let tar = TarBuilder::new()
        .file("a/one.txt", b"first")
        .file("a/two.txt", &[7u8; 1500])
        .finish();

    for (label, archive) in [("gz", gzip(&tar)), ("bz2", bzip2(&tar)), ("lzma", lzma(&tar))] {
        let dir = tempfile::tempdir()?;
        let options = ExtractOptions::new().destination(dir.path());
        let (result, _) = run(&archive, &options);
        let stats = result.map_err(|e| format!("{label}: {e}"))?;

        assert_eq!(stats.written, 2, "{label}");
        assert_eq!(fs::read(dir.path().join("a").join("one.txt"))?, b"first");
        assert_eq!(fs::read(dir.path().join("a").join("two.txt"))?, vec![7u8; 1500]);
    }
    Ok(())
}

#[test]
fn test_extract_path_uses_file_name() -> TestResult {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("out");
    fs::create_dir(&out)?;
    let archive_path = dir.path().join("bundle.tlz");
    fs::write(
        &archive_path,
        lzma(&TarBuilder::new().file("x.txt", b"x").finish()),
    )?;

    let options = ExtractOptions::new().destination(&out);
    let outcome = extract_path(&archive_path, &options, &mut |_: &str| {});
    assert_eq!(outcome, ExtractionOutcome::Success);
    assert_eq!(fs::read(out.join("x.txt"))?, b"x");
    Ok(())
}

#[test]
fn test_end_marker_stops_reading() -> TestResult {
    let dir = tempfile::tempdir()?;
    let archive = TarBuilder::new()
        .file("kept.txt", b"kept")
        .finish()
        .into_iter()
        .chain(std::iter::repeat_n(0xA5, 700))
        .collect::<Vec<_>>();

    let options = ExtractOptions::new().destination(dir.path());
    let (result, _) = run(&archive, &options);
    assert_eq!(result?.written, 1);
    Ok(())
}

#[test]
fn test_single_zero_block_ends_archive() -> TestResult {
    let dir = tempfile::tempdir()?;
    let archive = TarBuilder::new()
        .file("only.txt", b"1")
        .raw(&[0u8; BLOCK_SIZE])
        .unterminated();

    let options = ExtractOptions::new().destination(dir.path());
    let (result, _) = run(&archive, &options);
    assert_eq!(result?.written, 1);
    Ok(())
}

#[test]
fn test_bad_checksum_is_read_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let mut archive = TarBuilder::new()
        .file("good.txt", b"good")
        .file("bad.txt", b"bad")
        .finish();
    // Flip a name byte of the second header.
    archive[2 * BLOCK_SIZE] ^= 0x01;

    let options = ExtractOptions::new()
        .destination(dir.path())
        .compression(CompressionTag::None);
    let (result, _) = run(&archive, &options);
    let err = result.unwrap_err();
    assert!(matches!(err, UntgzError::ChecksumMismatch { .. }));
    assert_eq!(err.outcome(), ExtractionOutcome::ReadError);

    // Entries before the bad header stay on disk.
    assert_eq!(fs::read(dir.path().join("good.txt"))?, b"good");
    Ok(())
}

#[test]
fn test_signed_checksum_accepted() -> TestResult {
    let dir = tempfile::tempdir()?;
    let mut block = header("caf\u{e9}.txt", "", b'0', 2, DEFAULT_MTIME);
    block[148..156].fill(b' ');
    let signed: i64 = block.iter().map(|&b| i64::from(b as i8)).sum();
    block[148..156].copy_from_slice(format!("{:06o}\0 ", signed).as_bytes());

    let archive = TarBuilder::new().raw(&block).raw(b"ok").finish();
    let options = ExtractOptions::new()
        .destination(dir.path())
        .compression(CompressionTag::None);
    let (result, _) = run(&archive, &options);
    assert_eq!(result?.written, 1);
    assert_eq!(fs::read(dir.path().join("caf\u{e9}.txt"))?, b"ok");
    Ok(())
}

#[test]
fn test_truncated_archive_is_read_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let full = TarBuilder::new().file("big.bin", &[1u8; 3000]).finish();

    for cut in [BLOCK_SIZE + 100, 3 * BLOCK_SIZE, full.len() - 2 * BLOCK_SIZE] {
        let options = ExtractOptions::new()
            .destination(dir.path())
            .compression(CompressionTag::None);
        let (result, _) = run(&full[..cut], &options);
        let err = result.unwrap_err();
        assert!(
            matches!(err, UntgzError::IncompleteBlock { .. }),
            "cut at {cut}: {err}"
        );
    }
    Ok(())
}

#[test]
fn test_unsupported_container() -> TestResult {
    let dir = tempfile::tempdir()?;
    let mut archive = vec![0x1F, 0x9D, 0x90];
    archive.resize(2048, 0x42);

    let options = ExtractOptions::new().destination(dir.path());
    let mut lines = Vec::new();
    let outcome = extract(Cursor::new(&archive), &options, &mut |line: &str| {
        lines.push(line.to_string())
    });

    assert_eq!(outcome, ExtractionOutcome::ReadError);
    assert_eq!(outcome.code(), -1);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("Error: Unsupported compression format"));
    assert_eq!(fs::read_dir(dir.path())?.count(), 0);
    Ok(())
}

#[test]
fn test_wrong_explicit_container() -> TestResult {
    let dir = tempfile::tempdir()?;
    let archive = TarBuilder::new().file("a.txt", b"a").finish();
    let options = ExtractOptions::new()
        .destination(dir.path())
        .compression(CompressionTag::Bzip2);
    let (result, _) = run(&archive, &options);
    assert_eq!(result.unwrap_err().outcome(), ExtractionOutcome::ReadError);
    Ok(())
}

#[test]
fn test_include_and_exclude() -> TestResult {
    let tar = TarBuilder::new()
        .file("docs/readme.txt", b"r")
        .file("docs/notes.txt", b"n")
        .file("src/main.c", b"m")
        .file("b/c.txt", b"c")
        .finish();

    let dir = tempfile::tempdir()?;
    let options = ExtractOptions::new()
        .destination(dir.path())
        .include(["*.txt"])
        .exclude(["notes.txt"]);
    let (result, lines) = run(&tar, &options);
    let stats = result?;
    assert_eq!(stats.written, 2);
    assert_eq!(stats.filtered, 2);
    assert!(dir.path().join("docs").join("readme.txt").is_file());
    assert!(!dir.path().join("docs").join("notes.txt").exists());
    assert!(!dir.path().join("src").exists());
    assert!(lines.contains(&"Filtered src/main.c".to_string()));

    // A pattern with one separator sees the last two components.
    let dir = tempfile::tempdir()?;
    let options = ExtractOptions::new()
        .destination(dir.path())
        .include(["b/*.txt"]);
    let (result, _) = run(&tar, &options);
    assert_eq!(result?.written, 1);
    assert!(dir.path().join("b").join("c.txt").is_file());
    Ok(())
}

#[test]
fn test_junk_paths() -> TestResult {
    let dir = tempfile::tempdir()?;
    let archive = TarBuilder::new()
        .dir("deep/")
        .file("deep/er/file.txt", b"f")
        .finish();

    let options = ExtractOptions::new().destination(dir.path()).junk_paths(true);
    let (result, lines) = run(&archive, &options);
    let stats = result?;
    assert_eq!(stats.written, 1);
    assert_eq!(fs::read(dir.path().join("file.txt"))?, b"f");
    assert!(!dir.path().join("deep").exists());
    assert_eq!(lines, vec!["Writing file.txt"]);
    Ok(())
}

#[test]
fn test_single_file_mode() -> TestResult {
    let dir = tempfile::tempdir()?;
    let archive = TarBuilder::new()
        .file("pkg/bin/tool.exe", b"tool")
        .file("pkg/bin/other.exe", b"other")
        .finish();

    let options = ExtractOptions::new()
        .destination(dir.path())
        .single_file("tool.exe");
    let (result, _) = run(&archive, &options);
    let stats = result?;
    assert_eq!((stats.written, stats.filtered), (1, 1));
    assert_eq!(fs::read(dir.path().join("tool.exe"))?, b"tool");
    Ok(())
}

#[test]
fn test_skip_existing() -> TestResult {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("a.txt"), b"local")?;
    let archive = TarBuilder::new()
        .file("a.txt", b"from archive")
        .file("b.txt", b"new")
        .finish();

    let options = ExtractOptions::new()
        .destination(dir.path())
        .keep(KeepPolicy::SkipExisting);
    let (result, lines) = run(&archive, &options);
    let stats = result?;
    assert_eq!((stats.written, stats.skipped), (1, 1));
    assert_eq!(fs::read(dir.path().join("a.txt"))?, b"local");
    assert_eq!(fs::read(dir.path().join("b.txt"))?, b"new");
    assert_eq!(lines, vec!["Skipping a.txt", "Writing b.txt"]);
    Ok(())
}

#[test]
fn test_update_if_newer() -> TestResult {
    let dir = tempfile::tempdir()?;
    let older = dir.path().join("older.txt");
    let newer = dir.path().join("newer.txt");
    fs::write(&older, b"old local")?;
    fs::write(&newer, b"new local")?;
    filetime::set_file_mtime(&older, FileTime::from_unix_time(1_000_000_000, 0))?;
    filetime::set_file_mtime(&newer, FileTime::from_unix_time(2_000_000_000, 0))?;

    let archive = TarBuilder::new()
        .file("older.txt", b"archive")
        .file("newer.txt", b"archive")
        .finish();

    let options = ExtractOptions::new()
        .destination(dir.path())
        .keep(KeepPolicy::UpdateIfNewer);
    let (result, _) = run(&archive, &options);
    let stats = result?;
    assert_eq!((stats.written, stats.skipped), (1, 1));
    assert_eq!(fs::read(&older)?, b"archive");
    assert_eq!(mtime_of(&older)?, DEFAULT_MTIME as i64);
    assert_eq!(fs::read(&newer)?, b"new local");
    Ok(())
}

#[test]
fn test_overwrite_truncates() -> TestResult {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("a.txt"), b"a much longer local file")?;
    let archive = TarBuilder::new().file("a.txt", b"short").finish();

    let options = ExtractOptions::new().destination(dir.path());
    let (result, _) = run(&archive, &options);
    result?;
    assert_eq!(fs::read(dir.path().join("a.txt"))?, b"short");
    Ok(())
}

#[test]
fn test_directories_and_existing_parents() -> TestResult {
    let dir = tempfile::tempdir()?;
    fs::create_dir_all(dir.path().join("x").join("y"))?;
    let archive = TarBuilder::new()
        .dir("x/")
        .dir("x/y/")
        .entry("x/y/z/", "", b'0', &[], DEFAULT_MTIME)
        .dir("empty")
        .file("x/y/z/w/leaf.txt", b"leaf")
        .finish();

    let options = ExtractOptions::new().destination(dir.path());
    let (result, _) = run(&archive, &options);
    let stats = result?;
    assert_eq!(stats.directories, 4);
    assert!(dir.path().join("empty").is_dir());
    assert!(dir.path().join("x").join("y").join("z").is_dir());
    assert_eq!(
        fs::read(dir.path().join("x").join("y").join("z").join("w").join("leaf.txt"))?,
        b"leaf"
    );
    Ok(())
}

#[test]
fn test_prefix_field_joins_path() -> TestResult {
    let dir = tempfile::tempdir()?;
    let archive = TarBuilder::new()
        .entry("file.txt", "pre/fix", b'0', b"p", DEFAULT_MTIME)
        .finish();

    let options = ExtractOptions::new().destination(dir.path());
    let (result, lines) = run(&archive, &options);
    result?;
    assert_eq!(lines, vec!["Writing pre/fix/file.txt"]);
    assert!(dir.path().join("pre").join("fix").join("file.txt").is_file());
    Ok(())
}

#[test]
fn test_gnu_long_name() -> TestResult {
    let dir = tempfile::tempdir()?;
    let long = format!("{}/{}.txt", "segment".repeat(15), "n".repeat(60));
    assert!(long.len() > 100);

    let archive = TarBuilder::new()
        .long_file(&long, b"long")
        .file("after.txt", b"after")
        .finish();

    let options = ExtractOptions::new().destination(dir.path());
    let (result, lines) = run(&archive, &options);
    assert_eq!(result?.written, 2);
    assert_eq!(lines[0], format!("using GNU long filename [{long}]"));
    assert_eq!(lines[1], format!("Writing {long}"));
    assert_eq!(fs::read(dir.path().join(&long))?, b"long");

    // The staged name applies to one header only.
    assert_eq!(fs::read(dir.path().join("after.txt"))?, b"after");
    Ok(())
}

#[test]
fn test_oversized_long_name_rejected() -> TestResult {
    let dir = tempfile::tempdir()?;
    let archive = TarBuilder::new()
        .entry("././@LongLink", "", b'L', &[b'a'; 600], 0)
        .file("x", b"x")
        .finish();

    let options = ExtractOptions::new().destination(dir.path());
    let (result, _) = run(&archive, &options);
    assert!(matches!(
        result.unwrap_err(),
        UntgzError::InvalidLongName { size: 600, .. }
    ));
    Ok(())
}

#[test]
fn test_links_are_ignored() -> TestResult {
    let dir = tempfile::tempdir()?;
    let archive = TarBuilder::new()
        .entry("link", "", b'2', &[], DEFAULT_MTIME)
        .entry("pax", "", b'x', b"30 path=some/other/name.txt\n", DEFAULT_MTIME)
        .file("real.txt", b"real")
        .finish();

    let options = ExtractOptions::new().destination(dir.path());
    let (result, _) = run(&archive, &options);
    let stats = result?;
    assert_eq!((stats.written, stats.ignored), (1, 2));
    assert!(!dir.path().join("link").exists());
    assert_eq!(fs::read(dir.path().join("real.txt"))?, b"real");
    Ok(())
}

#[test]
fn test_strip_unsafe_prefix_guard() -> TestResult {
    let root = tempfile::tempdir()?;
    let dest = root.path().join("dest");
    fs::create_dir(&dest)?;
    let archive = TarBuilder::new()
        .file("../escape.txt", b"e")
        .file("/abs.txt", b"a")
        .finish();

    let options = ExtractOptions::new()
        .destination(&dest)
        .path_guard(StripUnsafePrefix);
    let (result, _) = run(&archive, &options);
    result?;
    assert!(dest.join("escape.txt").is_file());
    assert!(dest.join("abs.txt").is_file());
    assert!(!root.path().join("escape.txt").exists());
    Ok(())
}

#[test]
fn test_blocked_directory_is_extract_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("blocker"), b"file, not a directory")?;
    let archive = TarBuilder::new()
        .file("blocker/inside.txt", b"i")
        .finish();

    let options = ExtractOptions::new().destination(dir.path());
    let mut lines = Vec::new();
    let outcome = extract(Cursor::new(&archive), &options, &mut |line: &str| {
        lines.push(line.to_string())
    });
    assert_eq!(outcome, ExtractionOutcome::ExtractError);
    assert_eq!(outcome.code(), -2);
    assert!(lines.iter().any(|l| l.starts_with("Error: ")));
    Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn test_failed_write_removes_partial_file() -> TestResult {
    let full = std::path::Path::new("/dev/full");
    if !full.exists() {
        return Ok(());
    }
    let dir = tempfile::tempdir()?;
    // Every write to /dev/full fails with ENOSPC.
    std::os::unix::fs::symlink(full, dir.path().join("full.bin"))?;
    let archive = TarBuilder::new()
        .file("first.txt", b"kept")
        .file("full.bin", &[1u8; 1000])
        .file("never.txt", b"n")
        .finish();

    let options = ExtractOptions::new()
        .destination(dir.path())
        .keep(KeepPolicy::Overwrite);
    let (result, lines) = run(&archive, &options);
    let err = result.unwrap_err();

    assert!(matches!(err, UntgzError::FileWrite { .. }));
    assert_eq!(err.outcome(), ExtractionOutcome::ExtractError);
    assert!(fs::symlink_metadata(dir.path().join("full.bin")).is_err());
    assert_eq!(fs::read(dir.path().join("first.txt"))?, b"kept");
    assert!(!dir.path().join("never.txt").exists());
    assert_eq!(lines, vec!["Writing first.txt", "Writing full.bin"]);
    Ok(())
}

#[test]
fn test_sniff_gzip_magic_over_extension() -> TestResult {
    let dir = tempfile::tempdir()?;
    let archive = gzip(&TarBuilder::new().file("g.txt", b"g").finish());

    let options = ExtractOptions::new()
        .destination(dir.path())
        .archive_name("misnamed.tbz");
    let (result, _) = run(&archive, &options);
    assert_eq!(result?.written, 1);
    Ok(())
}

#[test]
fn test_sniff_plain_tar_named_gz() -> TestResult {
    let dir = tempfile::tempdir()?;
    let archive = TarBuilder::new().file("p.txt", b"p").finish();

    let options = ExtractOptions::new()
        .destination(dir.path())
        .archive_name("plain.tar.gz");
    let (result, _) = run(&archive, &options);
    assert_eq!(result?.written, 1);
    Ok(())
}
