// src/scan/report.rs

/// Summary for a human reader, or `None` when nothing looked like a formula.
///
/// The first block counts the formula cells; a second block listing each malicious value on
/// its own line follows when any were found.
pub fn generate_report<F, M>(flagged: &[F], malicious: &[M]) -> Option<String>
where
    F: AsRef<str>,
    M: AsRef<str>,
{
    if flagged.is_empty() {
        return None;
    }

    let mut report = match flagged.len() {
        1 => "There was 1 formulae pattern detected.\n".to_string(),
        n => format!("There were {} formulae patterns detected.\n", n),
    };
    report.push_str(
        "These will be automatically evaluated by some spreadsheet editors such as Excel, \
         this is a potential risk.\n",
    );

    if !malicious.is_empty() {
        report.push_str(
            "\nIn addition, several of these formulae cells contained keywords known to occur \
             in malicious contexts;\n\
             please verify with the sender why the following cell formulae are required:\n",
        );
        for value in malicious {
            report.push_str(value.as_ref());
            report.push('\n');
        }
    }

    Some(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_without_flags() {
        let none: [&str; 0] = [];
        assert_eq!(generate_report(&none, &none), None);
    }

    #[test]
    fn single_benign_formula() {
        let report = generate_report(&["-5"], &[] as &[&str]).unwrap();
        assert!(report.contains("1 formulae pattern detected"));
        assert!(report.contains("spreadsheet editors"));
        assert!(!report.contains("please verify"));
    }

    #[test]
    fn lists_malicious_values_one_per_line() {
        let flagged = ["=1+1", "=cmd.exe|'calc'", "=HYPERLINK(\"x\")"];
        let malicious = ["=cmd.exe|'calc'", "=HYPERLINK(\"x\")"];
        let report = generate_report(&flagged, &malicious).unwrap();

        assert!(report.starts_with("There were 3 formulae patterns detected.\n"));
        let tail: Vec<&str> = report
            .split("are required:\n")
            .nth(1)
            .expect("malicious block")
            .lines()
            .collect();
        assert_eq!(tail, vec!["=cmd.exe|'calc'", "=HYPERLINK(\"x\")"]);
    }
}
