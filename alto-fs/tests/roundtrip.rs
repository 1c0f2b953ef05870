//! End-to-end scenarios driving `Fs` purely through its public API, the way
//! an external tool like `adar` would.

use alto_fs::{Error, Fs, Geometry};

fn tiny_geometry() -> Geometry {
    Geometry { num_disks: 1, num_cylinders: 8, num_heads: 1, num_sectors: 4 }
}

#[test]
fn fresh_filesystem_has_no_files_and_passes_integrity() {
    let fs = Fs::create(tiny_geometry()).unwrap();
    let mut seen = 0;
    fs.scan_files(&mut |_fs, _fe| {
        seen += 1;
        alto_fs::ScanControl::Continue
    })
    .unwrap();
    assert_eq!(seen, 0);
    assert!(fs.check_integrity(-1).is_ok());
}

#[test]
fn find_file_on_empty_fs_is_not_found() {
    let fs = Fs::create(tiny_geometry()).unwrap();
    assert!(matches!(fs.find_file("<SysDir>Foo.bar"), Err(Error::NotFound)));
}

#[test]
fn scavenge_on_empty_fs_is_not_found() {
    let fs = Fs::create(tiny_geometry()).unwrap();
    assert!(matches!(fs.scavenge_file("Foo.bar"), Err(Error::NotFound)));
}

#[test]
fn save_then_load_is_a_fixed_point_for_an_untouched_image() {
    let dir = std::env::temp_dir();
    let path = dir.join("alto_fs_roundtrip_test.img");
    let resave_path = dir.join("alto_fs_roundtrip_test_resaved.img");

    let fs = Fs::create(tiny_geometry()).unwrap();
    fs.save_image(&path).unwrap();

    let mut reloaded = Fs::create(tiny_geometry()).unwrap();
    reloaded.load_image(&path).unwrap();
    reloaded.save_image(&resave_path).unwrap();

    let original = std::fs::read(&path).unwrap();
    let resaved = std::fs::read(&resave_path).unwrap();
    assert_eq!(original, resaved);

    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(&resave_path);
}

#[test]
fn load_image_rejects_wrong_sized_file() {
    let dir = std::env::temp_dir();
    let path = dir.join("alto_fs_wrong_size_test.img");
    std::fs::write(&path, vec![0u8; 17]).unwrap();

    let mut fs = Fs::create(tiny_geometry()).unwrap();
    assert!(matches!(fs.load_image(&path), Err(Error::InvalidImage { .. })));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn vda_rda_conversion_is_consistent_across_the_whole_disk() {
    let fs = Fs::create(tiny_geometry()).unwrap();
    for vda in 0..fs.len() as u16 {
        assert_eq!(fs.rda_to_vda(fs.vda_to_rda(vda)), vda);
    }
}
