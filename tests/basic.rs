use sdlog::{
    BufferedFileLogger, FileName, FsDevice, LogError, LogSink, MemDevice, StreamLogger,
};
use std::fs;
use tempfile::TempDir;

fn name(s: &str) -> FileName {
    FileName::new(s).unwrap()
}

#[test]
fn no_loss_across_flushes() {
    let dev = MemDevice::new(2048);
    let mut logger: BufferedFileLogger<MemDevice, 64, 16> = BufferedFileLogger::new();
    logger.begin(dev.clone(), name("log.txt")).unwrap();

    let mut expected = Vec::new();
    for round in 0..20u8 {
        // Stay below the primary capacity between flushes
        for i in 0..(round as usize % 50 + 1) {
            let b = b'a' + ((round as usize + i) % 26) as u8;
            logger.put_byte(b);
            expected.push(b);
        }
        if round % 3 == 0 {
            logger.prepare_buffer();
        }
        logger.flush_all().unwrap();
    }

    assert_eq!(dev.contents("log.txt").unwrap(), expected);
    assert_eq!(logger.size(), expected.len() as u64);
}

#[test]
fn wrapped_buffer_matches_linear_order() {
    let dev = MemDevice::new(16);
    let mut logger: BufferedFileLogger<MemDevice, 8, 4> = BufferedFileLogger::new();
    logger.begin(dev.clone(), name("log.txt")).unwrap();

    // Staging advances the primary tail without a reset
    logger.put_bytes(b"xxxxxx");
    assert_eq!(logger.prepare_buffer(), 4);
    logger.flush().unwrap();
    assert_eq!((logger.primary().tail(), logger.primary().head()), (4, 6));

    logger.put_bytes(b"0123");
    assert!(logger.primary().head() < logger.primary().tail());
    logger.flush().unwrap();

    assert_eq!(dev.contents("log.txt").unwrap(), b"xxxxxx0123");
    assert_eq!(logger.internal_size(), 0);
}

#[test]
fn overwritten_ninth_byte_scenario() {
    let dev = MemDevice::new(16);
    let mut logger: BufferedFileLogger<MemDevice, 8, 4> = BufferedFileLogger::new();
    logger.begin(dev.clone(), name("log.txt")).unwrap();
    let before = dev.write_calls();

    for b in b"ABCDEFGHI" {
        logger.put_byte(*b);
    }
    logger.flush().unwrap();

    assert_eq!(dev.contents("log.txt").unwrap(), b"BCDEFGHI");
    assert_eq!(dev.write_calls() - before, 2);
    assert_eq!(logger.internal_size(), 0);
}

#[test]
fn buffer_only_mode_never_writes() {
    let mut logger: BufferedFileLogger<MemDevice> = BufferedFileLogger::new();
    logger.begin_buffered().unwrap();
    for i in 0..100u8 {
        logger.put_byte(b'0' + i % 10);
    }
    logger.flush().unwrap();
    assert_eq!(logger.internal_size(), 100);
    assert!(!logger.is_enabled());
}

#[test]
fn short_write_refuses_retry() {
    let dev = MemDevice::new(16);
    let mut logger: BufferedFileLogger<MemDevice, 16, 8> = BufferedFileLogger::new();
    logger.begin(dev.clone(), name("log.txt")).unwrap();

    dev.set_write_budget(Some(2));
    logger.put_bytes(b"abcd");
    let err = logger.flush().unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(logger.internal_size(), 4);

    // A healthy device again does not let the prefix go out twice
    dev.set_write_budget(None);
    let err = logger.flush().unwrap_err();
    assert!(matches!(err, LogError::Latched { failed: "write" }));
    assert!(err.is_fatal());
    assert_eq!(dev.contents("log.txt").unwrap(), b"ab");
    assert_eq!(logger.internal_size(), 4);
}

#[test]
fn sync_failure_is_fatal() {
    let dev = MemDevice::new(16);
    let mut logger: BufferedFileLogger<MemDevice> = BufferedFileLogger::new();
    logger.begin(dev.clone(), name("log.txt")).unwrap();
    dev.fail_sync(true);
    logger.put_bytes(b"data");
    let err = logger.flush().unwrap_err();
    assert!(matches!(err, LogError::Sync { .. }));
    assert!(err.is_fatal());
    assert_eq!(logger.internal_size(), 4);

    dev.fail_sync(false);
    assert!(matches!(
        logger.flush(),
        Err(LogError::Latched { failed: "sync" })
    ));
    assert!(matches!(logger.flush_all(), Err(LogError::Latched { .. })));
    assert_eq!(dev.contents("log.txt").unwrap(), b"data");
    assert_eq!(dev.sync_calls(), 1);
}

#[test]
fn fs_device_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let dev = FsDevice::new(tmp.path(), 4096).unwrap();
    fs::write(tmp.path().join("log000.txt"), b"previous run").unwrap();

    let mut logger: BufferedFileLogger<FsDevice> = BufferedFileLogger::new();
    logger.put_bytes(b"early\n");
    logger.begin_default(dev).unwrap();
    assert_eq!(logger.capacity(), 4096 * 512);

    logger.put_bytes(b"line 1\n");
    logger.prepare_buffer();
    logger.put_bytes(b"line 2\n");
    logger.rename_file(name("run1.txt")).unwrap();
    logger.close_file().unwrap();

    assert!(!tmp.path().join("log000.txt").exists());
    let contents = fs::read(tmp.path().join("run1.txt")).unwrap();
    assert_eq!(contents, b"early\nline 1\nline 2\n");
}

#[test]
fn fs_device_rename_keeps_existing_target() {
    let tmp = TempDir::new().unwrap();
    let dev = FsDevice::new(tmp.path(), 64).unwrap();
    fs::write(tmp.path().join("taken.txt"), b"keep me").unwrap();

    let mut logger: BufferedFileLogger<FsDevice> = BufferedFileLogger::new();
    logger.begin(dev, name("log.txt")).unwrap();
    logger.put_bytes(b"fresh");
    logger.flush().unwrap();

    let err = logger.rename_file(name("taken.txt")).unwrap_err();
    assert!(matches!(err, LogError::Rename { .. }));
    assert_eq!(fs::read(tmp.path().join("taken.txt")).unwrap(), b"keep me");
    assert_eq!(logger.file_name(), Some(name("log.txt")));

    logger.rename_file(name("moved.txt")).unwrap();
    logger.put_bytes(b"!");
    logger.close_file().unwrap();
    assert!(!tmp.path().join("log.txt").exists());
    assert_eq!(fs::read(tmp.path().join("moved.txt")).unwrap(), b"fresh!");
}

#[test]
fn fs_device_size_tracks_file() {
    let tmp = TempDir::new().unwrap();
    let dev = FsDevice::new(tmp.path().join("card"), 1).unwrap();
    let mut logger: BufferedFileLogger<FsDevice> = BufferedFileLogger::new();
    logger.begin(dev, name("a.log")).unwrap();
    assert_eq!(logger.size(), 0);
    logger.put_bytes(b"12345");
    logger.flush().unwrap();
    assert_eq!(logger.size(), 5);
    let dev = logger.detach().unwrap().unwrap();
    assert_eq!(dev.root(), tmp.path().join("card"));
    assert_eq!(logger.size(), 0);
}

#[test]
fn sinks_share_one_interface() {
    fn log_line(sink: &mut dyn LogSink, line: &str) {
        sink.put_bytes(line.as_bytes());
        sink.put_byte(b'\n');
    }

    let dev = MemDevice::new(16);
    let mut file_logger: BufferedFileLogger<MemDevice> = BufferedFileLogger::new();
    file_logger.begin(dev.clone(), name("log.txt")).unwrap();
    let mut stream_logger: StreamLogger<Vec<u8>> = StreamLogger::new(Vec::new());

    let sinks: [&mut dyn LogSink; 2] = [&mut file_logger, &mut stream_logger];
    for sink in sinks {
        log_line(sink, "hello");
        sink.flush().unwrap();
    }

    assert_eq!(dev.contents("log.txt").unwrap(), b"hello\n");
    assert_eq!(stream_logger.get_ref(), b"hello\n");
    assert!(file_logger.staging().is_some());
}
