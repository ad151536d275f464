use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use unibo::{
    CourseId, Degree, DegreeIdResolver, Fetch, Interval, ScrapeError, ScrapingConfig,
    ScrapingContext, catalog, curriculum, exams,
};

/// Canned pages keyed by url. Unknown urls answer 404.
#[derive(Default)]
struct PageServer {
    pages: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl PageServer {
    fn page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), body.into());
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetch for PageServer {
    async fn fetch_bytes(&self, url: &str) -> unibo::error::Result<Vec<u8>> {
        self.requested.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .map(|body| body.as_bytes().to_vec())
            .ok_or_else(|| ScrapeError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

fn context(server: Arc<PageServer>) -> ScrapingContext {
    ScrapingContext::with_fetcher(&ScrapingConfig::default(), server).unwrap()
}

fn exam_page(subjects: &[(&str, &str, &str)]) -> String {
    let groups: String = subjects
        .iter()
        .enumerate()
        .map(|(i, (code, title, date))| {
            format!(
                "<h3 role=tab id=tab{i}><a href=#><span class=code>{code}</span> {title} <span class=docente>DOCENTE {i}</span></a></h3>
                 <div role=tabpanel id=panel{i}><table>
                    <tr><th>Data e ora:<td>{date}
                    <tr><th>Lista iscrizioni:<td>chiusa
                    <tr><th>Tipo prova:<td>Scritto
                    <tr><th>Luogo:<td>AULA {i}
                 </table></div>"
            )
        })
        .collect();
    format!("<html><body><div role=tablist>{groups}</div></body></html>")
}

const EXAMS_URL: &str = "https://corsi.unibo.it/laurea/IngegneriaInformatica/appelli";

fn informatica() -> CourseId {
    CourseId::new("laurea", "IngegneriaInformatica")
}

#[tokio::test]
async fn exams_are_collected_across_pages() {
    let server = Arc::new(
        PageServer::default()
            .page(
                EXAMS_URL,
                exam_page(&[
                    ("00001", "ANALISI", "10 gennaio 2025 ore 09:00"),
                    ("00002", "FISICA", "11 gennaio 2025 ore 14:30"),
                ]),
            )
            .page(
                &format!("{EXAMS_URL}?b_start:int=20"),
                exam_page(&[("00003", "RETI", "12 febbraio 2025 ore 10:00")]),
            )
            .page(&format!("{EXAMS_URL}?b_start:int=40"), exam_page(&[])),
    );
    let ctx = context(server.clone());

    let found = exams::fetch_exams(&ctx, &informatica(), None).await.unwrap();

    let codes: Vec<&str> = found.iter().map(|e| e.subject_code.as_str()).collect();
    assert_eq!(codes, ["00001", "00002", "00003"]);
    assert_eq!(found[2].location, "AULA 0");
    assert_eq!(found[1].date.naive_local().to_string(), "2025-01-11 14:30:00");
    assert_eq!(server.requested().len(), 3);
}

#[tokio::test]
async fn failing_page_fails_the_whole_listing() {
    let server = Arc::new(PageServer::default().page(
        EXAMS_URL,
        exam_page(&[("00001", "ANALISI", "10 gennaio 2025 ore 09:00")]),
    ));
    let ctx = context(server.clone());

    let err = exams::fetch_exams(&ctx, &informatica(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::Status { status: 404, ref url } if url.ends_with("b_start:int=20")));
}

#[tokio::test]
async fn subject_filter_is_sent_on_every_page() {
    let first = format!("{EXAMS_URL}?appelli=RETI");
    let server = Arc::new(
        PageServer::default()
            .page(&first, exam_page(&[("00003", "RETI", "12 febbraio 2025 ore 10:00")]))
            .page(&format!("{first}&b_start:int=20"), exam_page(&[])),
    );
    let ctx = context(server.clone());

    let found = exams::fetch_exams(&ctx, &informatica(), Some("RETI"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert!(server.requested().iter().all(|url| url.contains("appelli=RETI")));
}

const DEGREE_URL: &str = "https://www.unibo.it/it/didattica/corsi-di-studio/corso/2024/9254";

#[tokio::test]
async fn timetable_resolves_the_degree_first() {
    let timetable = r#"[{"cod_modulo":"28004_1","periodo_calendario":"","cod_sdoppiamento":"28004_1--A-K","title":"FONDAMENTI DI INFORMATICA T-1","docente":"Paola Mello",
        "start":"2024-10-07T09:00:00","end":"2024-10-07T12:00:00","cfu":12,"teledidattica":false,"aule":[]}]"#;
    let server = Arc::new(
        PageServer::default()
            .page(
                DEGREE_URL,
                r#"<p><a title="Sito del corso" href="https://corsi.unibo.it/laurea/IngegneriaInformatica">Sito</a></p>"#,
            )
            .page(
                "https://corsi.unibo.it/laurea/IngegneriaInformatica/orario-lezioni/@@orario_reale_json?anno=1&start=2024-10-07&end=2024-10-07",
                timetable,
            ),
    );
    let ctx = context(server.clone());
    let degree = Degree::new(DEGREE_URL, 3);
    let day = Interval::day(NaiveDate::from_ymd_opt(2024, 10, 7).unwrap());

    let events = degree.timetable(&ctx, 1, None, Some(&day)).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].teacher, "Paola Mello");
    assert_eq!(events[0].start.to_rfc3339(), "2024-10-07T09:00:00+02:00");

    // The id is scraped once and reused.
    degree.timetable(&ctx, 1, None, Some(&day)).await.unwrap();
    let degree_fetches = server
        .requested()
        .iter()
        .filter(|url| url.as_str() == DEGREE_URL)
        .count();
    assert_eq!(degree_fetches, 1);
}

#[tokio::test]
async fn resolver_reports_missing_and_malformed_links() {
    let server = Arc::new(
        PageServer::default()
            .page("https://a", "<html>nothing here</html>")
            .page(
                "https://b",
                r#"<a title="Sito del corso" href="https://corsi.unibo.it/laurea">x</a>"#,
            ),
    );
    let ctx = context(server);
    let resolver = DegreeIdResolver::new("https://corsi.unibo.it").unwrap();

    let missing = resolver.resolve(&ctx, "https://a").await.unwrap_err();
    assert!(matches!(missing, ScrapeError::IdNotFound { .. }));
    assert!(missing.is_layout_drift());

    let malformed = resolver.resolve(&ctx, "https://b").await.unwrap_err();
    assert!(matches!(malformed, ScrapeError::IdFormat { ref found, .. } if found == "laurea"));
}

fn curricula_url(year: u32) -> String {
    format!(
        "https://corsi.unibo.it/laurea/IngegneriaInformatica/orario-lezioni/@@available_curricula?anno={year}"
    )
}

#[tokio::test]
async fn curricula_are_keyed_by_year() {
    let server = Arc::new(
        PageServer::default()
            .page(&curricula_url(1), r#"[{"selected":false,"value":"000-000","label":"CURRICULUM COMUNE"}]"#)
            .page(&curricula_url(2), r#"[{"value":"A58-000","label":"AUTOMAZIONE"},{"value":"B12-000","label":"SISTEMI"}]"#)
            .page(&curricula_url(3), "[]"),
    );
    let ctx = context(server);

    let all = curriculum::fetch_all_curricula(&ctx, &informatica(), 3)
        .await
        .unwrap();
    assert_eq!(all.keys().copied().collect::<Vec<_>>(), [1, 2, 3]);
    assert_eq!(all[&1][0].value, "000-000");
    assert_eq!(all[&2].len(), 2);
    assert!(all[&3].is_empty());
}

#[tokio::test]
async fn one_failing_year_fails_the_fan_out() {
    let server = Arc::new(
        PageServer::default()
            .page(&curricula_url(1), "[]")
            .page(&curricula_url(3), "[]"),
    );
    let ctx = context(server);

    let err = curriculum::fetch_all_curricula(&ctx, &informatica(), 3)
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::Status { ref url, .. } if url == &curricula_url(2)));
}

const PACKAGE_URL: &str = "https://dati.unibo.it/api/3/action/package_show?id=degree-programmes";
const DEGREES_CSV_URL: &str = "https://dati.unibo.it/dataset/degree-programmes/resource/corsi_2024_it.csv";

fn catalog_server(csv: &str) -> Arc<PageServer> {
    let package = format!(
        r#"{{"help":"","success":true,"result":{{"id":"p","name":"degree-programmes","resources":[
            {{"id":"en","url":"https://dati.unibo.it/en.csv","alias":"corsi_latest_en"}},
            {{"id":"it","url":"{DEGREES_CSV_URL}","alias":"corsi_2024_it,corsi_latest_it"}}]}}}}"#
    );
    Arc::new(
        PageServer::default()
            .page(PACKAGE_URL, package)
            .page(DEGREES_CSV_URL, csv),
    )
}

const DEGREES_HEADER: &str = "annoaccademico,immatricolabile,corso_codice,corso_descrizione,url,campus,sededidattica,ambiti,tipologia,durata,internazionale,internazionale_titolo,internazionale_lingua,lingue,accesso";

#[tokio::test]
async fn degrees_come_from_the_latest_catalog_file() {
    let csv = format!(
        "{DEGREES_HEADER}\n2024/2025,SI,8615,INGEGNERIA INFORMATICA,{DEGREE_URL},Bologna,Bologna,Ingegneria,Laurea,3,false,,,italiano,libero\n"
    );
    let server = catalog_server(&csv);
    let ctx = context(server.clone());

    let degrees = catalog::fetch_degrees(&ctx).await.unwrap();
    assert_eq!(degrees.len(), 1);
    let degree = &degrees[0];
    assert_eq!(degree.academic_year, "2024/2025");
    assert_eq!(degree.code, "8615");
    assert_eq!(degree.description, "INGEGNERIA INFORMATICA");
    assert_eq!(degree.url, DEGREE_URL);
    assert_eq!(degree.campus, "Bologna");
    assert_eq!(degree.duration_in_years, 3);
    assert!(!degree.international);
    assert_eq!(degree.languages, "italiano");
    assert_eq!(server.requested(), [PACKAGE_URL, DEGREES_CSV_URL]);
}

#[tokio::test]
async fn catalog_rows_of_the_wrong_width_are_rejected() {
    let csv = format!("{DEGREES_HEADER}\n2024/2025,SI,8615,INGEGNERIA INFORMATICA,{DEGREE_URL},Bologna,Bologna,Ingegneria,Laurea,3,false,,italiano,libero\n");
    let ctx = context(catalog_server(&csv));

    let err = catalog::fetch_degrees(&ctx).await.unwrap_err();
    assert!(matches!(err, ScrapeError::Parse { ref url, ref message }
        if url == DEGREES_CSV_URL && message.contains("number of fields: 14")));
}
