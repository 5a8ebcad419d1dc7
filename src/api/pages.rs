use actix_web::{HttpResponse, Responder, get, web};
use serde_json::json;

use crate::config::{AuthMode, Config};

const PAGE: &str = r#"<!doctype html>
<html lang="ja">
<head>
<meta charset="utf-8">
<title>勤怠確認ダッシュボード</title>
<style>
body { font-family: sans-serif; margin: 2rem; }
table { border-collapse: collapse; }
th, td { border: 1px solid #ccc; padding: 4px 8px; white-space: nowrap; }
th { background: #f3f3f3; position: sticky; top: 0; }
.error { color: #b00020; }
</style>
</head>
<body>
<h1>勤怠確認ダッシュボード</h1>
<div id="signin" hidden>__SIGNIN__</div>
<div id="viewer" hidden>
  <p><span id="who"></span> <button onclick="logout()">ログアウト</button></p>
  <p id="summary"></p>
  <div id="table"></div>
</div>
<p id="error" class="error"></p>
<script>
const api = "__API__";
const esc = s => String(s).replace(/[&<>"]/g, c => ({"&":"&amp;","<":"&lt;",">":"&gt;","\"":"&quot;"}[c]));
async function show() {
  const me = await fetch(api + "/v1/me");
  if (me.status === 401) { return signin(); }
  const session = await me.json();
  document.getElementById("viewer").hidden = false;
  document.getElementById("who").textContent = session.display_name + " (" + session.identity + ")";
  const res = await fetch(api + "/v1/attendance");
  const body = await res.json();
  if (!res.ok) { document.getElementById("error").textContent = body.error; return; }
  document.getElementById("summary").textContent = body.label + ": " + body.count;
  if (body.message) { document.getElementById("table").textContent = body.message; return; }
  const head = body.columns.map(c => "<th>" + esc(c) + "</th>").join("");
  const rows = body.rows.map(r => "<tr>" + r.map(c => "<td>" + esc(c) + "</td>").join("") + "</tr>").join("");
  document.getElementById("table").innerHTML = "<table><tr>" + head + "</tr>" + rows + "</table>";
}
async function signin() {
  document.getElementById("signin").hidden = false;
  const select = document.getElementById("roster");
  if (!select) { return; }
  const res = await fetch("/auth/roster");
  const body = await res.json();
  if (!res.ok) { document.getElementById("error").textContent = body.error; return; }
  for (const e of body) {
    const opt = document.createElement("option");
    opt.value = e.login_id;
    opt.textContent = e.name + " <" + e.login_id + ">";
    select.appendChild(opt);
  }
}
async function rosterLogin() {
  const login_id = document.getElementById("roster").value;
  const res = await fetch("/auth/roster", { method: "POST", headers: { "Content-Type": "application/json" }, body: JSON.stringify({ login_id }) });
  if (!res.ok) { document.getElementById("error").textContent = (await res.json()).error; return; }
  location.reload();
}
async function logout() {
  await fetch("/auth/logout", { method: "POST" });
  location.reload();
}
show();
</script>
</body>
</html>
"#;

const GOOGLE_SIGNIN: &str = r#"<a href="/auth/login">Google でログイン</a>"#;
const ROSTER_SIGNIN: &str =
    r#"<select id="roster"></select> <button onclick="rosterLogin()">ログイン</button>"#;

/// Renders the dashboard page for the configured sign-in mode.
pub fn render_page(config: &Config) -> String {
    let signin = match config.auth_mode {
        AuthMode::OAuth => GOOGLE_SIGNIN,
        AuthMode::Roster => ROSTER_SIGNIN,
    };
    PAGE.replace("__SIGNIN__", signin)
        .replace("__API__", &config.api_prefix)
}

#[get("/")]
pub async fn index(config: web::Data<Config>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(render_page(&config))
}

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}
