use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn write_report(path: &Path, org: &str, ips: &[&str]) {
    let mut doc = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n<feedback>\n  <report_metadata>\n",
    );
    doc.push_str(&format!("    <org_name>{org}</org_name>\n"));
    doc.push_str(&format!("    <email>noreply-dmarc@{org}</email>\n"));
    doc.push_str("    <report_id>1234567890</report_id>\n");
    doc.push_str(
        "    <date_range>\n      <begin>1410000000</begin>\n      <end>1410086399</end>\n    </date_range>\n",
    );
    doc.push_str("  </report_metadata>\n  <policy_published>\n");
    doc.push_str("    <domain>example.com</domain>\n    <adkim>r</adkim>\n    <aspf>r</aspf>\n");
    doc.push_str("    <p>none</p>\n    <pct>100</pct>\n  </policy_published>\n");
    for ip in ips {
        doc.push_str(&format!(
            "  <record>\n    <row>\n      <source_ip>{ip}</source_ip>\n      <count>3</count>\n      \
             <policy_evaluated>\n        <disposition>none</disposition>\n        <dkim>pass</dkim>\n        \
             <spf>pass</spf>\n      </policy_evaluated>\n    </row>\n    <identifiers>\n      \
             <header_from>example.com</header_from>\n    </identifiers>\n    <auth_results>\n      \
             <dkim>\n        <domain>example.com</domain>\n        <result>pass</result>\n      </dkim>\n      \
             <spf>\n        <domain>example.com</domain>\n        <result>pass</result>\n      </spf>\n    \
             </auth_results>\n  </record>\n"
        ));
    }
    doc.push_str("</feedback>\n");
    fs::write(path, doc).unwrap();
}

#[test]
fn single_report_writes_sibling_csv() {
    let tmp = tempdir().unwrap();
    let xml = tmp.path().join("google.com!example.com!1410000000.xml");
    write_report(&xml, "google.com", &["192.0.2.1", "192.0.2.2"]);

    let mut cmd = Command::cargo_bin("dmarc-csv").unwrap();
    cmd.arg(&xml).arg("--utc");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Rows written: 2"));

    let csv_path = tmp.path().join("google.com!example.com!1410000000.csv");
    let content = fs::read_to_string(csv_path).unwrap();
    let mut lines = content.lines();
    insta::assert_snapshot!(lines.next().unwrap(), @"org_name,email,extra_contact_info,report_id,date_range_begin,date_range_end,domain,adkim,aspf,p,pct,source_ip,count,policy_evaluated_disposition,policy_evaluated_dkim,policy_evaluated_spf,policy_evaluated_reason_type,policy_evaluated_reason_comment,envelope_to,header_from,dkim_domain,dkim_result,dkim_human_result,spf_domain,spf_result");
    assert_eq!(
        lines.next().unwrap(),
        "google.com,noreply-dmarc@google.com,NULL,1234567890,2014-09-06,2014-09-07,\
         example.com,r,r,none,100,192.0.2.1,3,none,pass,pass,NULL,NULL,NULL,example.com,\
         example.com,pass,NULL,example.com,pass"
    );
    assert!(lines.next().unwrap().contains("192.0.2.2"));
    assert!(lines.next().is_none());
}

#[test]
fn multiple_reports_need_outfile() {
    let tmp = tempdir().unwrap();
    let a = tmp.path().join("a.xml");
    let b = tmp.path().join("b.xml");
    write_report(&a, "a.example", &["192.0.2.1"]);
    write_report(&b, "b.example", &["192.0.2.2"]);

    let mut cmd = Command::cargo_bin("dmarc-csv").unwrap();
    cmd.arg(&a).arg(&b);
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("--outfile must be set"));
    assert!(!tmp.path().join("a.csv").exists());
}

#[test]
fn multiple_reports_concatenate_in_order() {
    let tmp = tempdir().unwrap();
    let a = tmp.path().join("a.xml");
    let b = tmp.path().join("b.xml");
    let out = tmp.path().join("all.csv");
    write_report(&a, "a.example", &["192.0.2.1", "192.0.2.2"]);
    write_report(&b, "b.example", &["198.51.100.1", "198.51.100.2", "198.51.100.3"]);

    let mut cmd = Command::cargo_bin("dmarc-csv").unwrap();
    cmd.arg(&b).arg(&a).arg("-o").arg(&out).arg("-q");
    cmd.assert().success().stdout(predicate::str::is_empty());

    let content = fs::read_to_string(out).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[1..4].iter().all(|l| l.starts_with("b.example,")));
    assert!(lines[4..].iter().all(|l| l.starts_with("a.example,")));
    assert!(lines[5].contains("192.0.2.2"));
}

#[test]
fn batch_directory_writes_processed_csv() {
    let tmp = tempdir().unwrap();
    write_report(&tmp.path().join("2.xml"), "two.example", &["192.0.2.2"]);
    write_report(&tmp.path().join("1.xml"), "one.example", &["192.0.2.1"]);
    fs::write(tmp.path().join("readme.txt"), "ignored").unwrap();

    let mut cmd = Command::cargo_bin("dmarc-csv").unwrap();
    cmd.arg(tmp.path()).arg("-q");
    cmd.assert().success();

    let content = fs::read_to_string(tmp.path().join("processed.csv")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("one.example,"));
    assert!(lines[2].starts_with("two.example,"));
}

#[test]
fn missing_policy_aborts_with_extraction_status() {
    let tmp = tempdir().unwrap();
    let good = tmp.path().join("good.xml");
    let bad = tmp.path().join("bad.xml");
    let out = tmp.path().join("out.csv");
    write_report(&good, "good.example", &["192.0.2.1"]);
    fs::write(
        &bad,
        "<feedback><report_metadata><org_name>x</org_name></report_metadata>\
         <record><row><source_ip>203.0.113.7</source_ip></row></record></feedback>",
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("dmarc-csv").unwrap();
    cmd.arg(&good).arg(&bad).arg(&good).arg("-o").arg(&out);
    cmd.assert()
        .code(3)
        .stderr(predicate::str::contains("bad.xml"));

    let content = fs::read_to_string(out).unwrap();
    assert_eq!(content.lines().count(), 2);
    assert!(!content.contains("203.0.113.7"));
}

#[test]
fn skip_invalid_continues_but_reports_status() {
    let tmp = tempdir().unwrap();
    let good = tmp.path().join("good.xml");
    let bad = tmp.path().join("bad.xml");
    let out = tmp.path().join("out.csv");
    write_report(&good, "good.example", &["192.0.2.1"]);
    fs::write(&bad, "<feedback><policy_published/></feedback>").unwrap();

    let mut cmd = Command::cargo_bin("dmarc-csv").unwrap();
    cmd.arg(&bad)
        .arg(&good)
        .arg("-o")
        .arg(&out)
        .arg("--skip-invalid")
        .arg("--color")
        .arg("never");
    cmd.assert()
        .code(3)
        .stdout(predicate::str::contains("Skipped Files (1)"));

    let content = fs::read_to_string(out).unwrap();
    assert_eq!(content.lines().count(), 2);
    assert!(content.contains("192.0.2.1"));
}

#[test]
fn malformed_xml_fails_with_generic_status() {
    let tmp = tempdir().unwrap();
    let bad = tmp.path().join("broken.xml");
    fs::write(&bad, "<feedback><report_metadata><org_name>x</report_metadata>").unwrap();

    let mut cmd = Command::cargo_bin("dmarc-csv").unwrap();
    cmd.arg(&bad);
    cmd.assert()
        .code(4)
        .stderr(predicate::str::contains("broken.xml"));
}

#[test]
fn missing_input_is_a_config_error() {
    let tmp = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("dmarc-csv").unwrap();
    cmd.arg(tmp.path().join("missing.xml"));
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("input not found"));
}

#[test]
fn stdout_output_and_forced_mmap() {
    let tmp = tempdir().unwrap();
    let xml = tmp.path().join("r.xml");
    write_report(&xml, "r.example", &["192.0.2.9"]);

    let mut cmd = Command::cargo_bin("dmarc-csv").unwrap();
    cmd.arg(&xml)
        .arg("-o")
        .arg("-")
        .arg("--mmap-threshold")
        .arg("32");
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("org_name,").and(predicate::str::contains("192.0.2.9")))
        .stdout(predicate::str::contains("Rows written").not());
}
