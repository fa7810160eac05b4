use crate::report::{render_report, REPORT_SECTIONS, REPORT_TITLE};

#[test]
fn test_report_renders_every_section_in_order() {
    // Act
    let report = render_report();

    // Assert
    assert!(report.starts_with(REPORT_TITLE));
    let mut last = 0;
    for section in REPORT_SECTIONS {
        let position = report
            .find(&format!("## {}", section.heading))
            .unwrap_or_else(|| panic!("missing section {}", section.heading));
        assert!(position > last, "Sections keep their order");
        last = position;
    }
}

#[test]
fn test_report_states_headline_gmv() {
    assert!(render_report().contains("$61.73K"));
}
