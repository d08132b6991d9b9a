use anyhow::{Context, Result};
use chrono::NaiveDate;
use flate2::read::GzDecoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;
use url::Url;

use super::utils::fetch_and_save;
use crate::core::config::IngestConfig;

/// Firm-level metadata from one `Info` element of the compiled feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedFirm {
    #[serde(rename = "SECRgnCD")]
    pub sec_rgn_cd: Option<String>,
    #[serde(rename = "FirmCrdNb")]
    pub firm_crd_nb: i64,
    #[serde(rename = "SECNb")]
    pub sec_nb: Option<String>,
    #[serde(rename = "BusNm")]
    pub bus_nm: Option<String>,
    #[serde(rename = "LegalNm")]
    pub legal_nm: Option<String>,
    #[serde(rename = "UmbrRgstn")]
    pub umbr_rgstn: Option<String>,
    #[serde(rename = "DownloadPath")]
    pub download_path: Option<String>,
}

pub fn feed_file_name(date: NaiveDate) -> String {
    format!("IA_FIRM_SEC_Feed_{}.xml.gz", date.format("%m_%d_%Y"))
}

pub fn feed_url(base: &Url, date: NaiveDate) -> Result<Url> {
    Ok(base.join(&feed_file_name(date))?)
}

pub fn report_url(base: &Url, firm_crd_nb: i64) -> Result<Url> {
    Ok(base.join(&format!("{0}/PDF/{0}.pdf", firm_crd_nb))?)
}

/// Gunzips the feed and decodes it as ISO-8859-1.
pub fn decode_feed(gz: &[u8]) -> Result<String> {
    let mut raw = Vec::new();
    GzDecoder::new(gz)
        .read_to_end(&mut raw)
        .context("Feed is not a valid gzip stream")?;

    // encoding_rs serves the ISO-8859-1 label with windows-1252.
    let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(&raw);
    Ok(text.into_owned())
}

fn firm_from_info(element: &BytesStart<'_>) -> Result<Option<FeedFirm>> {
    let mut firm = FeedFirm::default();
    let mut crd = None;

    for attr in element.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?.trim().to_string();
        let value = (!value.is_empty()).then_some(value);
        match attr.key.as_ref() {
            b"SECRgnCD" => firm.sec_rgn_cd = value,
            b"FirmCrdNb" => crd = value.and_then(|v| v.parse::<i64>().ok()),
            b"SECNb" => firm.sec_nb = value,
            b"BusNm" => firm.bus_nm = value,
            b"LegalNm" => firm.legal_nm = value,
            b"UmbrRgstn" => firm.umbr_rgstn = value,
            _ => {}
        }
    }

    Ok(crd.map(|firm_crd_nb| FeedFirm {
        firm_crd_nb,
        ..firm
    }))
}

/// Every `Info` element of the feed, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedFirm>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut firms = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"Info" => {
                match firm_from_info(e)? {
                    Some(firm) => firms.push(firm),
                    None => log::warn!(
                        "Skipping feed Info element without a FirmCrdNb at position {}",
                        reader.buffer_position()
                    ),
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Error parsing feed XML at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
            _ => (),
        }
    }

    Ok(firms)
}

pub fn with_download_paths(firms: Vec<FeedFirm>, report_base: &Url) -> Result<Vec<FeedFirm>> {
    firms
        .into_iter()
        .map(|firm| {
            let url = report_url(report_base, firm.firm_crd_nb)?;
            Ok(FeedFirm {
                download_path: Some(url.to_string()),
                ..firm
            })
        })
        .collect()
}

pub fn filter_targets(firms: Vec<FeedFirm>, targets: &[i64]) -> Vec<FeedFirm> {
    let targets: HashSet<i64> = targets.iter().copied().collect();
    firms
        .into_iter()
        .filter(|firm| targets.contains(&firm.firm_crd_nb))
        .collect()
}

/// Downloads (or reuses) the compiled feed for the configured working date.
pub async fn fetch_feed(client: &Client, config: &IngestConfig) -> Result<Vec<FeedFirm>> {
    let url = feed_url(&config.feed_base_url, config.working_date)?;
    let path = config.data_dir.join(feed_file_name(config.working_date));
    log::info!("Loading compiled feed {}", url);

    fetch_and_save(client, &url, &path, &config.user_agent)
        .await
        .with_context(|| format!("Failed to download feed {}", url))?;

    let gz = tokio::fs::read(&path).await?;
    let xml = decode_feed(&gz)?;
    let firms = parse_feed(&xml)?;
    log::info!("Feed lists {} firms", firms.len());

    with_download_paths(firms, &config.report_base_url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const FEED: &str = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<IAPDFirmSECReport GenOn="2025-04-24">
  <Firms>
    <Firm>
      <Info SECRgnCD="NYRO" FirmCrdNb="160882" SECNb="801-72004" BusNm="ACME CAPITAL" LegalNm="ACME CAPITAL LP" UmbrRgstn="N"/>
      <MainAddr Strt1="1 MAIN ST" City="NEW YORK"/>
    </Firm>
    <Firm>
      <Info SECRgnCD="" FirmCrdNb="317731" SECNb="801-1" BusNm="BETA &amp; SONS" LegalNm="BETA" UmbrRgstn="Y"></Info>
    </Firm>
    <Firm>
      <Info BusNm="NO NUMBER"/>
    </Firm>
  </Firms>
</IAPDFirmSECReport>"#;

    #[test]
    fn test_parse_feed_info_attributes() {
        let firms = parse_feed(FEED).unwrap();
        assert_eq!(firms.len(), 2);

        assert_eq!(firms[0].firm_crd_nb, 160882);
        assert_eq!(firms[0].sec_rgn_cd.as_deref(), Some("NYRO"));
        assert_eq!(firms[0].legal_nm.as_deref(), Some("ACME CAPITAL LP"));

        assert_eq!(firms[1].firm_crd_nb, 317731);
        assert_eq!(firms[1].sec_rgn_cd, None);
        assert_eq!(firms[1].bus_nm.as_deref(), Some("BETA & SONS"));
    }

    #[test]
    fn test_decode_feed_latin1() {
        let mut raw = b"<Info FirmCrdNb=\"1\" BusNm=\"CAF".to_vec();
        raw.push(0xC9); // É in ISO-8859-1
        raw.extend_from_slice(b"\"/>");

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw).unwrap();
        let gz = encoder.finish().unwrap();

        let xml = decode_feed(&gz).unwrap();
        let firms = parse_feed(&xml).unwrap();
        assert_eq!(firms[0].bus_nm.as_deref(), Some("CAFÉ"));
    }

    #[test]
    fn test_decode_feed_rejects_plain_xml() {
        assert!(decode_feed(FEED.as_bytes()).is_err());
    }

    #[test]
    fn test_urls() {
        let base = Url::parse("https://reports.adviserinfo.sec.gov/reports/CompilationReports/")
            .unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 4, 24).unwrap();
        assert_eq!(
            feed_url(&base, date).unwrap().as_str(),
            "https://reports.adviserinfo.sec.gov/reports/CompilationReports/IA_FIRM_SEC_Feed_04_24_2025.xml.gz"
        );

        let reports = Url::parse("https://reports.adviserinfo.sec.gov/reports/ADV/").unwrap();
        assert_eq!(
            report_url(&reports, 160882).unwrap().as_str(),
            "https://reports.adviserinfo.sec.gov/reports/ADV/160882/PDF/160882.pdf"
        );
    }

    #[test]
    fn test_filter_targets_and_download_paths() {
        let reports = Url::parse("https://reports.adviserinfo.sec.gov/reports/ADV/").unwrap();
        let firms = with_download_paths(parse_feed(FEED).unwrap(), &reports).unwrap();
        let targets = filter_targets(firms, &[317731, 999]);

        assert_eq!(targets.len(), 1);
        assert_eq!(
            targets[0].download_path.as_deref(),
            Some("https://reports.adviserinfo.sec.gov/reports/ADV/317731/PDF/317731.pdf")
        );
    }
}
