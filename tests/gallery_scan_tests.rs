/// Gallery scan tests
/// Drive the full browser-path scan over saved HTML pages, no Chrome needed

use client_selection::browser::{Snapshot, SnapshotPage, KEY_NEXT};
use client_selection::clock::ManualClock;
use client_selection::config::Config;
use client_selection::gallery::GalleryScanner;
use client_selection::models::GalleryTarget;
use std::fs;
use std::path::Path;

const GALLERY_URL: &str = "https://example.smugmug.com/Dragonhood";

fn grid_page(count: usize, with_password: bool) -> String {
    let mut html = String::from("<html><head><title>Dragonhood</title></head><body>");
    if with_password {
        html.push_str(r#"<form><input type="password"><button type="submit">Enter</button></form>"#);
    }
    html.push_str(r#"<div class="sm-gallery">"#);
    for i in 1..=count {
        html.push_str(&format!(
            r#"<a href="/Dragonhood/i-img{i}"><img src="https://photos.smugmug.com/Dragonhood/i-img{i}/0/Th/IMG_000{i}-Th.jpg"></a>"#
        ));
    }
    html.push_str("</div></body></html>");
    html
}

fn lightbox_page(i: usize, comment: Option<&str>) -> String {
    let comments = comment
        .map(|c| format!(r#"<div class="sm-comments"><div class="sm-comment">{}</div></div>"#, c))
        .unwrap_or_default();
    format!(
        r#"<html><head><title>SmugMug</title></head><body>
            <img src="https://photos.smugmug.com/Dragonhood/i-img{i}/0/L/IMG_000{i}-L.jpg">
            <div class="sm-image-name">IMG_000{i}.jpg</div>
            {comments}
        </body></html>"#
    )
}

/// Five images; 2 and 4 carry the reviewer's comments, 5 someone else's
fn fixture(with_password: bool) -> SnapshotPage {
    let comments = [
        None,
        Some("Clair Polleti: love this one"),
        None,
        Some("Clair Polleti said: great shot, please print"),
        Some("Jordan Reyes: lovely light here"),
    ];

    let mut snapshots = vec![Snapshot::new(GALLERY_URL, grid_page(5, with_password))];
    for (index, comment) in comments.iter().enumerate() {
        let i = index + 1;
        snapshots.push(Snapshot::new(
            format!("{}/i-img{}", GALLERY_URL, i),
            lightbox_page(i, *comment),
        ));
    }
    SnapshotPage::new(snapshots)
}

fn scanner(dir: &Path) -> GalleryScanner {
    let mut config = Config::default();
    config.output.dir = dir.to_path_buf();
    let scan = config.scan.without_delays();
    GalleryScanner::new(&config).with_scan_config(scan)
}

#[test]
fn test_scan_lists_only_reviewer_commented_images() {
    let dir = tempfile::tempdir().unwrap();
    let page = fixture(false);
    let target = GalleryTarget::new(GALLERY_URL, None, "Dragonhood");

    let outcome = scanner(dir.path())
        .scan(&page, &ManualClock::new(), &target)
        .unwrap();

    assert!(outcome.completed);
    assert_eq!(outcome.images_found, 5);
    assert!(page.screenshot_requests().is_empty());
    let filenames: Vec<&str> = outcome.results.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(filenames, vec!["IMG_0002.jpg", "IMG_0004.jpg"]);
    assert_eq!(
        outcome.results.iter().map(|r| r.position).collect::<Vec<_>>(),
        vec![2, 4]
    );
    for result in &outcome.results {
        assert_eq!(result.comments.len(), 1);
    }

    // Four moves between five images, and the walk ends on the last one
    assert_eq!(page.pressed_keys(), vec![KEY_NEXT; 4]);
    assert_eq!(page.current_index(), 5);

    let metrics = outcome.metrics.unwrap();
    assert_eq!(metrics.images_checked, 5);
    assert_eq!(metrics.images_with_comments, 2);
}

#[test]
fn test_report_contents() {
    let dir = tempfile::tempdir().unwrap();
    let page = fixture(false);
    let target = GalleryTarget::new(GALLERY_URL, None, "Dragonhood");

    let outcome = scanner(dir.path())
        .scan(&page, &ManualClock::new(), &target)
        .unwrap();

    let name = outcome.report_path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("commented_images_Dragonhood_webscrape_"));
    assert!(name.ends_with(".txt"));

    let report = fs::read_to_string(&outcome.report_path).unwrap();
    assert!(report.starts_with("Images with Comments - Dragonhood (Web Scrape)\n"));
    assert!(report.contains(&format!("Gallery URL: {}\n", GALLERY_URL)));
    assert!(report.contains("LIVE RESULTS (written as found):\n==================================================\n\nIMG_0002.jpg\nIMG_0004.jpg\n"));
    assert_eq!(report.matches("File: ").count(), 2);
    assert_eq!(report.matches("Comments (1):").count(), 2);
    assert!(report.contains("  - Clair Polleti: Clair Polleti said: great shot, please print\n"));
    assert!(report.contains("Total: 2 images with comments\n"));
    assert!(!report.contains("Jordan"));
}

#[test]
fn test_password_protected_gallery() {
    let dir = tempfile::tempdir().unwrap();
    let page = fixture(true);
    let target = GalleryTarget::new(GALLERY_URL, Some("dragon".to_string()), "Dragonhood");

    let outcome = scanner(dir.path())
        .scan(&page, &ManualClock::new(), &target)
        .unwrap();

    assert_eq!(page.filled_values().len(), 1);
    assert_eq!(page.filled_values()[0].1, "dragon");
    assert_eq!(outcome.results.len(), 2);
}

#[test]
fn test_empty_gallery_still_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let page = SnapshotPage::new(vec![Snapshot::new(GALLERY_URL, grid_page(0, false))]);
    let target = GalleryTarget::new(GALLERY_URL, None, "Dragonhood");

    let outcome = scanner(dir.path())
        .scan(&page, &ManualClock::new(), &target)
        .unwrap();

    assert!(outcome.completed);
    assert_eq!(outcome.images_found, 0);
    assert!(outcome.results.is_empty());
    assert!(page.pressed_keys().is_empty());

    let report = fs::read_to_string(&outcome.report_path).unwrap();
    assert!(report.contains("Total: 0 images with comments"));
    assert_eq!(page.screenshot_requests(), vec![dir.path().join("debug_gallery.png")]);
}

#[test]
fn test_single_image_gallery_never_advances() {
    let dir = tempfile::tempdir().unwrap();
    let page = SnapshotPage::new(vec![
        Snapshot::new(GALLERY_URL, grid_page(1, false)),
        Snapshot::new(
            format!("{}/i-img1", GALLERY_URL),
            lightbox_page(1, Some("Clair: this is the cover shot")),
        ),
    ]);
    let target = GalleryTarget::new(GALLERY_URL, None, "Dragonhood");

    let outcome = scanner(dir.path())
        .scan(&page, &ManualClock::new(), &target)
        .unwrap();

    assert!(page.pressed_keys().is_empty());
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].filename, "IMG_0001.jpg");
}
