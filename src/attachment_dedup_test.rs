// Tests for note standardization: attachments, names and identifiers

#[cfg(test)]
mod standardize_tests {
    use crate::config::MigrationOptions;
    use crate::error::MigrationError;
    use crate::extract::{find_attachment_refs, AttachmentKind};
    use crate::identifier::{IdentifierIndex, NoteRecord};
    use crate::migration::{resolve_note_path, standardize_note};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_note(notebook: &Path, folder: &str, body: &str, files: &[(&str, &str)]) {
        let dir = notebook.join(folder);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("README.md"), body).unwrap();
        for (name, data) in files {
            let path = dir.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, data).unwrap();
        }
    }

    fn options(notebook: &Path) -> MigrationOptions {
        let options = MigrationOptions::new(notebook);
        fs::create_dir_all(options.attachments_dir()).unwrap();
        options
    }

    fn attachment_files(notebook: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(notebook.join("_attachments"))
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    /// Test: the same attachment referenced twice is copied once, both references agree
    #[test]
    fn test_repeated_reference_is_deduplicated() {
        let temp_dir = TempDir::new().unwrap();
        let notebook = temp_dir.path();
        write_note(
            notebook,
            "Report",
            "# Report\n\nSee [the scan](files/scan.pdf).\n\nAgain: [scan](files/scan.pdf)\n",
            &[("files/scan.pdf", "%PDF-1.4 data")],
        );

        let note = standardize_note(&options(notebook), None, "Report").unwrap();

        assert_eq!(note.attachments.len(), 1);
        assert_eq!(note.attachments[0].size, "%PDF-1.4 data".len() as u64);
        assert!(note.attachments[0].name.ends_with(".pdf"));

        let content = fs::read_to_string(notebook.join("Report.md")).unwrap();
        let refs: Vec<String> = find_attachment_refs(AttachmentKind::File, &content)
            .map(|r| r.path)
            .collect();
        let expected = format!("_attachments/{}", note.attachments[0].name);
        assert_eq!(refs, vec![expected.clone(), expected]);
        assert!(!content.contains("files/scan.pdf"));

        assert_eq!(attachment_files(notebook), vec![note.attachments[0].name.clone()]);
        println!("✅ Repeated attachment reference deduplicated");
    }

    /// Test: links and images are renamed independently of their length
    #[test]
    fn test_links_and_images_are_rewritten() {
        let temp_dir = TempDir::new().unwrap();
        let notebook = temp_dir.path();
        write_note(
            notebook,
            "Trip",
            "![a](a.png) text [doc](d.txt) ![b](b.jpeg) ![a again](a.png) [web](https://example.com)",
            &[("a.png", "A"), ("b.jpeg", "BB"), ("d.txt", "DDD")],
        );

        let note = standardize_note(&options(notebook), None, "Trip").unwrap();
        assert_eq!(note.attachments.len(), 3);
        // Files first, then images from the last reference back
        assert!(note.attachments[0].name.ends_with(".txt"));
        assert!(note.attachments[1].name.ends_with(".png"));
        assert!(note.attachments[2].name.ends_with(".jpeg"));

        let content = fs::read_to_string(notebook.join("Trip.md")).unwrap();
        let images: Vec<String> = find_attachment_refs(AttachmentKind::Image, &content)
            .map(|r| r.path)
            .collect();
        assert_eq!(images.len(), 3);
        assert_eq!(images[0], images[2]);
        assert_ne!(images[0], images[1]);
        assert!(content.contains("[web](https://example.com)"));
        assert_eq!(attachment_files(notebook).len(), 3);
    }

    /// Test: attachment names with parentheses are migrated whole
    #[test]
    fn test_attachment_with_parentheses() {
        let temp_dir = TempDir::new().unwrap();
        let notebook = temp_dir.path();
        write_note(
            notebook,
            "Scan",
            "[Scan(2).pdf](Scan(2).pdf)\n\n![shot](name(1).png)\n",
            &[("Scan(2).pdf", "%PDF"), ("name(1).png", "PNG!!")],
        );

        let note = standardize_note(&options(notebook), None, "Scan").unwrap();
        let sizes: Vec<u64> = note.attachments.iter().map(|a| a.size).collect();
        assert_eq!(sizes, vec![4, 5]);

        let content = fs::read_to_string(notebook.join("Scan.md")).unwrap();
        assert!(!content.contains("Scan(2)"));
        assert!(!content.contains("name(1)"));
        assert_eq!(attachment_files(notebook).len(), 2);
        println!("✅ Parentheses in attachment names handled");
    }

    /// Test: a linked image rewrites both the image and the link target
    #[test]
    fn test_linked_image() {
        let temp_dir = TempDir::new().unwrap();
        let notebook = temp_dir.path();
        write_note(notebook, "Gallery", "[![alt](img.png)](img.png)\n", &[("img.png", "IMG")]);

        let note = standardize_note(&options(notebook), None, "Gallery").unwrap();
        assert_eq!(note.attachments.len(), 1);

        let content = fs::read_to_string(notebook.join("Gallery.md")).unwrap();
        let new_path = format!("_attachments/{}", note.attachments[0].name);
        assert_eq!(content, format!("[![alt]({})]({})\n", new_path, new_path));
        assert_eq!(attachment_files(notebook).len(), 1);
    }

    /// Test: attachments are named from the last reference back
    #[test]
    fn test_attachments_in_reverse_position_order() {
        let temp_dir = TempDir::new().unwrap();
        let notebook = temp_dir.path();
        write_note(
            notebook,
            "Album",
            "![a](a.png) ![b](b.gif) ![c](c.jpg)",
            &[("a.png", "A"), ("b.gif", "B"), ("c.jpg", "C")],
        );

        let note = standardize_note(&options(notebook), None, "Album").unwrap();
        let extensions: Vec<&str> = note
            .attachments
            .iter()
            .map(|a| a.name.rsplit('.').next().unwrap())
            .collect();
        assert_eq!(extensions, vec!["jpg", "gif", "png"]);
    }

    /// Test: a markdown file shipped in the folder is migrated like any attachment,
    /// a link to a markdown file that is not there is left alone
    #[test]
    fn test_markdown_attachments() {
        let temp_dir = TempDir::new().unwrap();
        let notebook = temp_dir.path();
        write_note(
            notebook,
            "Readme",
            "[notes](notes.md) [elsewhere](Other.md)",
            &[("notes.md", "# Notes")],
        );

        let note = standardize_note(&options(notebook), None, "Readme").unwrap();
        assert_eq!(note.attachments.len(), 1);
        assert!(note.attachments[0].name.ends_with(".md"));

        let content = fs::read_to_string(notebook.join("Readme.md")).unwrap();
        assert!(!content.contains("(notes.md)"));
        assert!(content.ends_with("[elsewhere](Other.md)"));
        assert_eq!(attachment_files(notebook).len(), 1);
    }

    /// Test: a file linked and embedded is still one attachment
    #[test]
    fn test_link_and_image_of_same_file() {
        let temp_dir = TempDir::new().unwrap();
        let notebook = temp_dir.path();
        write_note(notebook, "Photo", "![p](p.png) [download](p.png)", &[("p.png", "PNG")]);

        let note = standardize_note(&options(notebook), None, "Photo").unwrap();
        assert_eq!(note.attachments.len(), 1);
        assert_eq!(attachment_files(notebook).len(), 1);
    }

    /// Test: attachment names are unique across notes
    #[test]
    fn test_attachment_names_are_unique() {
        let temp_dir = TempDir::new().unwrap();
        let notebook = temp_dir.path();
        write_note(notebook, "One", "![x](image.png)", &[("image.png", "1")]);
        write_note(notebook, "Two", "![x](image.png)", &[("image.png", "2")]);

        let options = options(notebook);
        let one = standardize_note(&options, None, "One").unwrap();
        let two = standardize_note(&options, None, "Two").unwrap();

        assert_ne!(one.attachments[0].name, two.attachments[0].name);
        assert_eq!(attachment_files(notebook).len(), 2);
    }

    /// Test: report-only computes metadata without touching the notebook
    #[test]
    fn test_report_only_does_not_write() {
        let temp_dir = TempDir::new().unwrap();
        let notebook = temp_dir.path();
        write_note(notebook, "Draft", "# Draft\n\n![x](x.png)", &[("x.png", "12345")]);

        let options = MigrationOptions::new(notebook)
            .with_report(notebook.join("report.csv"))
            .report_only(true);
        let note = standardize_note(&options, None, "Draft").unwrap();

        assert_eq!(note.metadata.name, "Draft.md");
        assert_eq!(note.metadata.title.as_deref(), Some("Draft"));
        assert_eq!(note.attachments[0].size, 5);
        assert!(!notebook.join("Draft.md").exists());
        assert!(!notebook.join("_attachments").exists());
        assert_eq!(
            fs::read_to_string(notebook.join("Draft").join("README.md")).unwrap(),
            "# Draft\n\n![x](x.png)"
        );
    }

    /// Test: a folder without a body is fatal
    #[test]
    fn test_missing_body_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let notebook = temp_dir.path();
        fs::create_dir(notebook.join("Empty")).unwrap();

        let result = standardize_note(&options(notebook), None, "Empty");
        assert!(matches!(result, Err(MigrationError::MissingNoteBody(_))));
    }

    /// Test: a referenced attachment missing from the export is an I/O error
    #[test]
    fn test_missing_attachment_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let notebook = temp_dir.path();
        write_note(notebook, "Broken", "![x](nowhere.png)", &[]);

        let result = standardize_note(&options(notebook), None, "Broken");
        assert!(matches!(result, Err(MigrationError::Io { .. })));
    }

    /// Test: colliding names get -1, -2 suffixes unless overwriting
    #[test]
    fn test_name_collisions() {
        let temp_dir = TempDir::new().unwrap();
        let notebook = temp_dir.path();
        let options = options(notebook);

        assert_eq!(resolve_note_path(&options, "Plan?"), notebook.join("Plan.md"));
        fs::write(notebook.join("Plan.md"), "").unwrap();
        assert_eq!(resolve_note_path(&options, "Plan!"), notebook.join("Plan-1.md"));
        fs::write(notebook.join("Plan-1.md"), "").unwrap();
        assert_eq!(resolve_note_path(&options, "'Plan'"), notebook.join("Plan-2.md"));

        let overwrite = options.clone().overwrite(true);
        assert_eq!(resolve_note_path(&overwrite, "Plan"), notebook.join("Plan.md"));
    }

    /// Test: two folders standardizing to the same name
    #[test]
    fn test_duplicate_folders() {
        let temp_dir = TempDir::new().unwrap();
        let notebook = temp_dir.path();
        write_note(notebook, "Ideas", "first", &[]);
        write_note(notebook, "Ideas?", "second", &[]);

        let options = options(notebook);
        let first = standardize_note(&options, None, "Ideas").unwrap();
        let second = standardize_note(&options, None, "Ideas?").unwrap();
        assert_eq!(first.metadata.name, "Ideas.md");
        assert_eq!(second.metadata.name, "Ideas-1.md");

        let overwrite = options.overwrite(true);
        let third = standardize_note(&overwrite, None, "Ideas?").unwrap();
        assert_eq!(third.metadata.name, "Ideas.md");
        assert_eq!(fs::read_to_string(notebook.join("Ideas.md")).unwrap(), "second");
    }

    /// Test: tags are normalized in the written note
    #[test]
    fn test_tags_are_normalized() {
        let temp_dir = TempDir::new().unwrap();
        let notebook = temp_dir.path();
        write_note(
            notebook,
            "Tagged",
            "---\ntags: [foo-bar, Foo_Bar]\n---\n\n#foo-bar #Foo_Bar",
            &[],
        );

        standardize_note(&options(notebook), None, "Tagged").unwrap();
        let content = fs::read_to_string(notebook.join("Tagged.md")).unwrap();
        assert!(content.ends_with("#foobar #foobar"));
    }

    /// Test: the Evernote ID is resolved and registered against the new file name
    #[test]
    fn test_identifier_is_registered() {
        let temp_dir = TempDir::new().unwrap();
        let notebook = temp_dir.path();
        write_note(notebook, "Known", "---\ntitle: Known\n---\n", &[]);
        write_note(notebook, "Stranger", "---\ntitle: Stranger\n---\n", &[]);

        let mut index = IdentifierIndex::new(vec![NoteRecord {
            id: "guid-known".to_string(),
            title: "Known".to_string(),
            created_ms: None,
            deleted: false,
        }]);
        let options = options(notebook);

        let known = standardize_note(&options, Some(&mut index), "Known").unwrap();
        assert_eq!(known.metadata.id.as_deref(), Some("guid-known"));
        assert_eq!(index.container_of("guid-known"), Some("Known.md"));

        let stranger = standardize_note(&options, Some(&mut index), "Stranger").unwrap();
        assert_eq!(stranger.metadata.id, None);
        assert_eq!(index.container_count(), 1);
    }
}
