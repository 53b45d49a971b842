//! Stateful stand-in for the remote values API.
//!
//! An in-memory tab map behind the same HTTP surface the remote backend
//! speaks (GET/PUT values, POST :append, POST :batchUpdate, metadata),
//! so the full remote write path runs against real requests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{Value, json};

type Tabs = BTreeMap<String, Vec<Vec<String>>>;

pub struct ValuesApiFake {
    base_url: String,
    state: Arc<Mutex<Tabs>>,
}

impl ValuesApiFake {
    pub fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind values api fake");
        let addr = listener.local_addr().expect("local addr");
        let state: Arc<Mutex<Tabs>> = Arc::default();

        let thread_state = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let Ok((method, target, body)) = read_request(&mut stream) else {
                    continue;
                };
                let mut tabs = thread_state.lock().unwrap_or_else(|e| e.into_inner());
                let (status, body) = route(&mut tabs, &method, &target, &body);
                write_response(&mut stream, status, &body);
            }
        });

        ValuesApiFake {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Raw rows of one tab, for direct assertions.
    pub fn rows(&self, tab: &str) -> Vec<Vec<String>> {
        let tabs = self.state.lock().unwrap_or_else(|e| e.into_inner());
        tabs.get(tab).cloned().unwrap_or_default()
    }
}

fn route(tabs: &mut Tabs, method: &str, target: &str, body: &str) -> (u16, String) {
    let path = target.split('?').next().unwrap_or(target);

    if let Some(range) = path.split("/values/").nth(1) {
        if let Some(range) = range.strip_suffix(":append") {
            return append_range(tabs, range, body);
        }
        return match method {
            "GET" => get_range(tabs, range),
            "PUT" => put_range(tabs, range, body),
            _ => (400, error_body("unsupported values method")),
        };
    }

    if path.ends_with(":batchUpdate") {
        return batch_update(tabs, body);
    }

    // Spreadsheet metadata. Sheet ids are assigned by key order; stable
    // as long as no tab is created between the lookup and its use.
    let sheets: Vec<Value> = tabs
        .keys()
        .enumerate()
        .map(|(index, title)| json!({ "properties": { "sheetId": index, "title": title } }))
        .collect();
    (200, json!({ "sheets": sheets }).to_string())
}

fn get_range(tabs: &Tabs, range: &str) -> (u16, String) {
    let Some((tab, cells)) = range.split_once('!') else {
        return (400, error_body(&format!("Unable to parse range: {range}")));
    };
    let Some(rows) = tabs.get(tab) else {
        return (400, error_body(&format!("Unable to parse range: {range}")));
    };

    let selected: Vec<Vec<String>> = match single_row(cells) {
        Some(index) => rows.get(index.wrapping_sub(1)).cloned().into_iter().collect(),
        None => rows.clone(),
    };
    if selected.is_empty() {
        // The real API omits "values" when the range holds no cells.
        return (200, json!({ "range": range }).to_string());
    }
    (200, json!({ "range": range, "values": selected }).to_string())
}

fn put_range(tabs: &mut Tabs, range: &str, body: &str) -> (u16, String) {
    let Some((tab, cells)) = range.split_once('!') else {
        return (400, error_body(&format!("Unable to parse range: {range}")));
    };
    let Some(rows) = tabs.get_mut(tab) else {
        return (400, error_body(&format!("Unable to parse range: {range}")));
    };

    let values = parse_values(body);
    match single_row(cells) {
        Some(index) => {
            let [row] = values.as_slice() else {
                return (400, error_body("single-row update expects exactly one row"));
            };
            if index == 0 {
                return (400, error_body("row indices are 1-based"));
            }
            if rows.len() < index {
                rows.resize(index, Vec::new());
            }
            rows[index - 1] = row.clone();
        }
        None => *rows = values,
    }
    (200, "{}".to_string())
}

fn append_range(tabs: &mut Tabs, range: &str, body: &str) -> (u16, String) {
    let Some((tab, _)) = range.split_once('!') else {
        return (400, error_body(&format!("Unable to parse range: {range}")));
    };
    let Some(rows) = tabs.get_mut(tab) else {
        return (400, error_body(&format!("Unable to parse range: {range}")));
    };

    // Appends land after the last occupied row.
    while rows
        .last()
        .is_some_and(|row| row.iter().all(|cell| cell.trim().is_empty()))
    {
        rows.pop();
    }
    rows.extend(parse_values(body));
    (200, "{}".to_string())
}

fn batch_update(tabs: &mut Tabs, body: &str) -> (u16, String) {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let request = &parsed["requests"][0];

    if let Some(title) = request["addSheet"]["properties"]["title"].as_str() {
        if tabs.contains_key(title) {
            return (
                400,
                error_body(&format!("A sheet with the name \"{title}\" already exists.")),
            );
        }
        tabs.insert(title.to_string(), Vec::new());
        return (200, "{}".to_string());
    }

    let delete = &request["deleteDimension"]["range"];
    if let Some(sheet_id) = delete["sheetId"].as_u64() {
        let start = delete["startIndex"].as_u64().unwrap_or(0) as usize;
        let end = delete["endIndex"].as_u64().unwrap_or(0) as usize;
        let Some(title) = tabs.keys().nth(sheet_id as usize).cloned() else {
            return (400, error_body("no sheet with the requested id"));
        };
        let rows = tabs.get_mut(&title).expect("sheet resolved by id");
        if start >= end || end > rows.len() {
            return (400, error_body("delete range out of bounds"));
        }
        rows.drain(start..end);
        return (200, "{}".to_string());
    }

    (400, error_body("unsupported batchUpdate request"))
}

fn single_row(cells: &str) -> Option<usize> {
    let first = cells.split(':').next()?;
    let digits: String = first.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn parse_values(body: &str) -> Vec<Vec<String>> {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let Some(rows) = parsed["values"].as_array() else {
        return Vec::new();
    };
    rows.iter()
        .map(|row| {
            row.as_array()
                .map(|cells| {
                    cells
                        .iter()
                        .map(|cell| cell.as_str().unwrap_or_default().to_string())
                        .collect()
                })
                .unwrap_or_default()
        })
        .collect()
}

fn error_body(message: &str) -> String {
    json!({ "error": { "message": message } }).to_string()
}

fn read_request(stream: &mut TcpStream) -> std::io::Result<(String, String, String)> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        let lower = line.to_ascii_lowercase();
        if let Some(value) = lower.strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }

    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body)?;
    }
    Ok((method, target, String::from_utf8_lossy(&body).into_owned()))
}

fn write_response(stream: &mut TcpStream, status: u16, body: &str) {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        _ => "Error",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
}
