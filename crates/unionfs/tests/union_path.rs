//! Path algebra exercised through a live filesystem.
//!
//! The layer is never read here; the paths only need an owning filesystem.

use std::sync::Arc;

use unionfs::{MaskPredicate, MemoryLayer, Providers, UnionError, UnionFs, UnionPath};

fn fs() -> (Providers, Arc<UnionFs>) {
    let providers = Providers::installed();
    let fs = providers
        .union()
        .new_filtered_filesystem(MaskPredicate::AllowAll, vec![MemoryLayer::new("src").into()])
        .unwrap();
    (providers, fs)
}

fn rel(fs: &UnionFs, names: &[&str]) -> UnionPath {
    let mut parts = vec![""];
    parts.extend_from_slice(names);
    fs.get_path_parts(&parts)
}

fn abs(fs: &UnionFs, names: &[&str]) -> UnionPath {
    let mut parts = vec!["/"];
    parts.extend_from_slice(names);
    fs.get_path_parts(&parts)
}

/// Checks name access, subpaths, and prefix/suffix tests against `names`.
fn check_name_parts(fs: &UnionFs, path: &UnionPath, names: &[&str]) {
    if names.is_empty() {
        if path.is_absolute() {
            assert_eq!(path.name_count(), 0, "{}", path);
        } else {
            assert_eq!(path.name_count(), 1, "{}", path);
            assert_eq!(path.name(0).unwrap(), fs.get_path(""));
        }
    } else {
        assert_eq!(path.name_count(), names.len(), "{}", path);
    }
    let count = path.name_count();

    assert!(path.name(count).is_err(), "{} name({})", path, count);
    for (i, name) in names.iter().enumerate() {
        assert_eq!(path.name(i).unwrap(), fs.get_path(name), "{} name({})", path, i);
    }

    if names.is_empty() || (names.len() == 1 && names[0].is_empty()) {
        assert_eq!(path.file_name(), None, "{}", path);
    } else {
        assert_eq!(path.file_name(), Some(fs.get_path(names[names.len() - 1])));
    }

    if names.is_empty() {
        if path.is_absolute() {
            assert!(path.subpath(0, 1).is_err());
        } else {
            assert_eq!(path.subpath(0, 1).unwrap(), fs.get_path(""));
        }
        return;
    }

    let n = names.len();
    for i in 1..=n {
        let from_start = &names[..i];
        let from_end = &names[n - i..];
        assert_eq!(path.subpath(0, i).unwrap(), rel(fs, from_start), "{} subpath(0, {})", path, i);
        assert_eq!(
            path.subpath(n - i, n).unwrap(),
            rel(fs, from_end),
            "{} subpath({}, {})",
            path,
            n - i,
            n
        );

        let (same, opposite): (fn(&UnionFs, &[&str]) -> UnionPath, fn(&UnionFs, &[&str]) -> UnionPath) =
            if path.is_absolute() { (abs, rel) } else { (rel, abs) };

        assert!(path.starts_with(&same(fs, from_start)), "{} starts_with {:?}", path, from_start);
        assert!(path.ends_with(&rel(fs, from_end)), "{} ends_with {:?}", path, from_end);
        assert!(!path.starts_with(&opposite(fs, from_start)));
        if path.is_absolute() {
            assert!(path.ends_with(&opposite(fs, from_end)));
        } else {
            assert!(!path.ends_with(&opposite(fs, from_end)));
        }

        let mut bad_start = from_start.to_vec();
        let mut bad_end = from_end.to_vec();
        bad_start[0] = "SOMETHINGINVALID";
        bad_end[0] = "SOMETHINGINVALID";
        assert!(!path.starts_with(&same(fs, &bad_start)));
        assert!(!path.ends_with(&same(fs, &bad_end)));
    }
}

#[test]
fn test_path_algebra() {
    let (_providers, fs) = fs();
    let p = |s: &str| fs.get_path(s);

    let rel_up = p("..");
    let rel0 = p("");
    let rel1 = p("one");
    let rel2 = p("two");
    let rel3 = p("three");
    let rel32 = fs.get_path_parts(&["three", "two"]);
    let rel123 = p("one/two/three");
    let rel1223 = p("one/two/./three");
    let rel12up3 = p("one/two/../three");
    let rel13 = p("one/three");
    let rel13slash = p("one/three/");
    let rel1slash3 = p("one//three");
    let rel_up_up1 = p("../../one");
    let rel_up_up123 = p("../../one/two/three");

    let abs_up = p("/..");
    let abs0 = p("/");
    let abs1 = p("/one");
    let abs2 = p("/two");
    let abs3 = p("/three");
    let abs32 = fs.get_path_parts(&["/", "three", "two"]);
    let abs123 = p("/one/two/three");
    let abs1223 = p("/one/two/./three");
    let abs12up3 = p("/one/two/../three");
    let abs13 = p("/one/three");
    let abs13slash = p("/one/three/");
    let abs1slash3 = p("/one//three");
    let abs_up_up1 = p("/../../one");
    let abs_up_up123 = p("/../../one/two/three");

    // General
    assert_eq!(rel13, rel13slash);
    assert_eq!(rel13, rel1slash3);
    assert_eq!(abs13, abs13slash);
    assert_eq!(abs13, abs1slash3);
    assert!(!fs.get_path_parts(&["", "one", "two"]).is_absolute());

    // Display
    let expected = [
        (&rel_up, ".."),
        (&rel0, ""),
        (&rel1, "one"),
        (&rel2, "two"),
        (&rel3, "three"),
        (&rel32, "three/two"),
        (&rel123, "one/two/three"),
        (&rel1223, "one/two/./three"),
        (&rel12up3, "one/two/../three"),
        (&rel13, "one/three"),
        (&rel13slash, "one/three"),
        (&rel1slash3, "one/three"),
        (&rel_up_up1, "../../one"),
        (&rel_up_up123, "../../one/two/three"),
        (&abs_up, "/.."),
        (&abs0, "/"),
        (&abs1, "/one"),
        (&abs2, "/two"),
        (&abs3, "/three"),
        (&abs32, "/three/two"),
        (&abs123, "/one/two/three"),
        (&abs1223, "/one/two/./three"),
        (&abs12up3, "/one/two/../three"),
        (&abs13, "/one/three"),
        (&abs13slash, "/one/three"),
        (&abs1slash3, "/one/three"),
        (&abs_up_up1, "/../../one"),
        (&abs_up_up123, "/../../one/two/three"),
    ];
    for (path, text) in expected {
        assert_eq!(path.to_string(), text);
        assert_eq!(path.is_absolute(), text.starts_with('/'), "{}", text);
    }

    // Parent
    let up = |path: &UnionPath, n: usize| {
        (0..n).try_fold(path.clone(), |p, _| p.parent())
    };
    assert_eq!(rel32.parent(), Some(rel3.clone()));
    assert_eq!(up(&rel123, 2), Some(rel1.clone()));
    assert_eq!(up(&rel1223, 3), Some(rel1.clone()));
    assert_eq!(up(&rel12up3, 3), Some(rel1.clone()));
    assert_eq!(rel13.parent(), Some(rel1.clone()));
    assert_eq!(up(&rel13, 2), None);
    assert_eq!(rel13slash.parent(), Some(rel1.clone()));
    assert_eq!(rel1slash3.parent(), Some(rel1.clone()));
    assert_eq!(abs32.parent(), Some(abs3.clone()));
    assert_eq!(up(&abs123, 2), Some(abs1.clone()));
    assert_eq!(up(&abs1223, 3), Some(abs1.clone()));
    assert_eq!(up(&abs12up3, 3), Some(abs1.clone()));
    assert_eq!(abs13.parent(), Some(abs1.clone()));
    assert_eq!(up(&abs13, 2), Some(abs0.clone()));
    assert_eq!(abs13slash.parent(), Some(abs1.clone()));
    assert_eq!(abs1slash3.parent(), Some(abs1.clone()));

    // Names, subpaths, prefixes and suffixes
    check_name_parts(&fs, &rel_up, &[".."]);
    check_name_parts(&fs, &rel0, &[""]);
    check_name_parts(&fs, &rel1, &["one"]);
    check_name_parts(&fs, &rel2, &["two"]);
    check_name_parts(&fs, &rel3, &["three"]);
    check_name_parts(&fs, &rel32, &["three", "two"]);
    check_name_parts(&fs, &rel123, &["one", "two", "three"]);
    check_name_parts(&fs, &rel1223, &["one", "two", ".", "three"]);
    check_name_parts(&fs, &rel12up3, &["one", "two", "..", "three"]);
    check_name_parts(&fs, &rel13, &["one", "three"]);
    check_name_parts(&fs, &rel13slash, &["one", "three"]);
    check_name_parts(&fs, &rel1slash3, &["one", "three"]);
    check_name_parts(&fs, &rel_up_up1, &["..", "..", "one"]);
    check_name_parts(&fs, &rel_up_up123, &["..", "..", "one", "two", "three"]);
    check_name_parts(&fs, &abs_up, &[".."]);
    check_name_parts(&fs, &abs0, &[]);
    check_name_parts(&fs, &abs1, &["one"]);
    check_name_parts(&fs, &abs2, &["two"]);
    check_name_parts(&fs, &abs3, &["three"]);
    check_name_parts(&fs, &abs32, &["three", "two"]);
    check_name_parts(&fs, &abs123, &["one", "two", "three"]);
    check_name_parts(&fs, &abs1223, &["one", "two", ".", "three"]);
    check_name_parts(&fs, &abs12up3, &["one", "two", "..", "three"]);
    check_name_parts(&fs, &abs13, &["one", "three"]);
    check_name_parts(&fs, &abs13slash, &["one", "three"]);
    check_name_parts(&fs, &abs1slash3, &["one", "three"]);
    check_name_parts(&fs, &abs_up_up1, &["..", "..", "one"]);
    check_name_parts(&fs, &abs_up_up123, &["..", "..", "one", "two", "three"]);

    // Normalize
    assert_eq!(rel0.normalize(), rel0);
    assert_eq!(rel1.normalize(), rel1);
    assert_eq!(rel13.normalize(), rel13);
    assert_eq!(rel1223.normalize(), rel123);
    assert_eq!(rel12up3.normalize(), rel13);
    assert_eq!(rel_up_up1.normalize(), rel_up_up1);
    assert_eq!(rel_up_up123.normalize(), rel_up_up123);
    assert_eq!(abs0.normalize(), abs0);
    assert_eq!(abs1.normalize(), abs1);
    assert_eq!(abs13.normalize(), abs13);
    assert_eq!(abs1223.normalize(), abs123);
    assert_eq!(abs12up3.normalize(), abs13);
    assert_eq!(abs_up_up1.normalize(), abs1);
    assert_eq!(abs_up_up123.normalize(), abs123);

    // Resolve
    assert_eq!(rel0.resolve(&abs32).unwrap(), abs32);
    assert_eq!(rel_up.resolve(&abs13).unwrap(), abs13);
    assert_eq!(rel123.resolve(&abs123).unwrap(), abs123);
    assert_eq!(rel0.resolve(&rel123).unwrap(), rel123);
    assert_eq!(rel1.resolve(&rel2).unwrap().resolve(&rel3).unwrap(), rel123);
    assert_eq!(rel3.resolve(&rel0).unwrap().resolve(&rel2).unwrap(), rel32);
    assert_eq!(abs0.resolve(&rel123).unwrap(), abs123);
    assert_eq!(abs1.resolve(&rel2).unwrap().resolve(&rel3).unwrap(), abs123);
    assert_eq!(abs3.resolve(&rel0).unwrap().resolve(&rel2).unwrap(), abs32);

    // Relativize
    assert!(rel1.relativize(&abs123).is_err());
    assert!(abs1.relativize(&rel123).is_err());

    assert_eq!(rel1.relativize(&rel123).unwrap(), p("two/three"));
    assert_eq!(rel123.relativize(&rel1).unwrap(), p("../.."));
    assert_eq!(rel1.relativize(&p("one/one")).unwrap(), rel1);
    assert_eq!(rel1.relativize(&rel13).unwrap(), rel3);
    assert_eq!(rel32.relativize(&p("one/one")).unwrap(), p("../../one/one"));
    assert_eq!(rel123.relativize(&p("one/one")).unwrap(), p("../../one"));

    assert_eq!(abs1.relativize(&abs123).unwrap(), p("two/three"));
    assert_eq!(abs123.relativize(&abs1).unwrap(), p("../.."));
    assert_eq!(abs1.relativize(&p("/one/one")).unwrap(), rel1);
    assert_eq!(abs1.relativize(&abs13).unwrap(), rel3);
    assert_eq!(abs32.relativize(&p("/one/one")).unwrap(), p("../../one/one"));
    assert_eq!(abs123.relativize(&p("/one/one")).unwrap(), p("../../one"));

    // Root
    assert_eq!(rel0.root(), None);
    assert_eq!(rel123.root(), None);
    assert_eq!(rel_up_up1.root(), None);
    assert_eq!(abs0.root(), Some(abs0.clone()));
    assert_eq!(abs123.root(), Some(abs0.clone()));
    assert_eq!(abs_up_up1.root(), Some(abs0.clone()));
}

#[test]
fn test_paths_are_bound_to_their_filesystem() {
    let (_providers, a) = fs();
    let (_other, b) = fs();
    assert_ne!(a.get_path("/one"), b.get_path("/one"));
    assert!(!a.get_path("/one/two").starts_with(&b.get_path("/one")));
    assert_eq!(a.get_path("/one").filesystem().unwrap().key(), a.key());
    assert!(!a.get_path("/one/two").ends_with(&b.get_path("two")));
}

#[test]
fn test_foreign_paths_are_rejected_by_resolve_and_relativize() {
    let (_providers, a) = fs();
    let (_other, b) = fs();

    assert!(matches!(
        a.get_path("/one").resolve(&b.get_path("two")),
        Err(UnionError::InvalidArgument(_))
    ));
    assert!(matches!(
        a.get_path("/one").resolve(&b.get_path("/two")),
        Err(UnionError::InvalidArgument(_))
    ));
    assert!(matches!(
        a.get_path("/one").relativize(&b.get_path("/one/two")),
        Err(UnionError::InvalidArgument(_))
    ));

    // Same filesystem still works, and the result stays bound to it.
    let joined = a.get_path("/one").resolve(&a.get_path("two")).unwrap();
    assert_eq!(joined.filesystem().unwrap().key(), a.key());
}
