//! Embedded browser UI served at `/`.

pub const INDEX_HTML: &str = r##"<!doctype html>
<html lang="es">
<head>
<meta charset="utf-8"/>
<meta name="viewport" content="width=device-width, initial-scale=1"/>
<title>Showroom</title>
<style>
  :root { --ink:#1f2937; --muted:#6b7280; --line:#e5e7eb; --accent:#2563eb; }
  * { box-sizing: border-box; }
  body { margin:0; font-family: system-ui, -apple-system, Segoe UI, Roboto, sans-serif; color:var(--ink); background:#f9fafb; }
  header { position:sticky; top:0; z-index:5; display:flex; flex-wrap:wrap; gap:8px; align-items:center; padding:10px 16px; background:#fff; border-bottom:1px solid var(--line); }
  header h1 { font-size:18px; margin:0 12px 0 0; }
  input, select, button, textarea { font:inherit; }
  input[type=search] { flex:1; min-width:180px; padding:7px 10px; border:1px solid var(--line); border-radius:8px; }
  select { padding:7px; border:1px solid var(--line); border-radius:8px; }
  button { padding:7px 12px; border:1px solid var(--line); border-radius:8px; background:#fff; cursor:pointer; }
  button.primary { background:var(--accent); color:#fff; border-color:var(--accent); }
  .badge { display:inline-block; min-width:20px; padding:0 6px; border-radius:10px; background:var(--accent); color:#fff; font-size:12px; text-align:center; }
  main { padding:16px; }
  #status { color:var(--muted); font-size:13px; margin-bottom:10px; }
  .grid { display:grid; grid-template-columns:repeat(auto-fill, minmax(220px, 1fr)); gap:14px; }
  .card { background:#fff; border:1px solid var(--line); border-radius:12px; overflow:hidden; display:flex; flex-direction:column; }
  .card img { width:100%; aspect-ratio:1; object-fit:contain; background:#f3f4f6; }
  .card .body { padding:10px; display:flex; flex-direction:column; gap:6px; flex:1; }
  .card .model { font-weight:600; }
  .card .short { color:var(--muted); font-size:13px; flex:1; }
  .card .price { font-size:13px; }
  .card.in-cart { outline:2px solid var(--accent); }
  dialog { width:min(900px, 96vw); border:none; border-radius:12px; padding:0; }
  dialog .head { display:flex; justify-content:space-between; align-items:center; padding:12px 16px; border-bottom:1px solid var(--line); }
  dialog .content { padding:12px 16px; max-height:70vh; overflow:auto; }
  dialog .foot { display:flex; flex-wrap:wrap; gap:8px; justify-content:flex-end; padding:12px 16px; border-top:1px solid var(--line); }
  table { width:100%; border-collapse:collapse; font-size:14px; }
  td, th { border-bottom:1px solid var(--line); padding:6px; text-align:left; vertical-align:top; }
  td img { width:64px; height:64px; object-fit:contain; background:#f3f4f6; }
  td textarea { width:100%; min-height:48px; }
  dl { display:grid; grid-template-columns:max-content 1fr; gap:4px 12px; font-size:14px; }
  dt { color:var(--muted); }
  pre { background:#111827; color:#e5e7eb; padding:10px; border-radius:8px; max-height:40vh; overflow:auto; font-size:12px; }
</style>
</head>
<body>
<header>
  <h1>Showroom</h1>
  <select id="buyer"></select>
  <input id="q" type="search" placeholder="Buscar modelo o descripción (coma = varias palabras)"/>
  <button id="open-cart" class="primary">Selección <span id="count" class="badge">0</span></button>
  <button id="reload">Recargar catálogo</button>
  <label><input id="upload" type="file" accept=".xlsx,.xls,.ods" hidden/><button id="upload-btn" type="button">Subir Excel</button></label>
  <button id="reload-images" hidden>Actualizar imágenes</button>
</header>
<main>
  <div id="status">Cargando…</div>
  <div id="grid" class="grid"></div>
</main>

<dialog id="cart-dialog">
  <div class="head"><strong>Selección de <span id="cart-buyer"></span></strong><button data-close>Cerrar</button></div>
  <div class="content">
    <table><thead><tr><th></th><th>Modelo</th><th>Descripción</th><th>Comentario</th><th></th></tr></thead><tbody id="cart-rows"></tbody></table>
    <h4>Producto adicional</h4>
    <div style="display:flex; flex-wrap:wrap; gap:8px; align-items:center">
      <input id="custom-model" placeholder="Nombre del producto"/>
      <input id="custom-note" placeholder="Comentario"/>
      <input id="custom-image" type="file" accept="image/*"/>
      <button id="custom-add">Agregar</button>
    </div>
  </div>
  <div class="foot">
    <button id="clear-cart">Vaciar</button>
    <button id="dl-excel">Descargar Excel</button>
    <button id="dl-pdf" class="primary">Descargar PDF</button>
  </div>
</dialog>

<dialog id="detail-dialog">
  <div class="head"><strong id="detail-title"></strong><button data-close>Cerrar</button></div>
  <div class="content" id="detail-body"></div>
</dialog>

<dialog id="job-dialog">
  <div class="head"><strong>Actualización de imágenes</strong><button data-close>Cerrar</button></div>
  <div class="content"><div id="job-state"></div><pre id="job-log"></pre></div>
</dialog>

<script>
const $ = (id) => document.getElementById(id);
const state = { buyer: '', items: [], cart: [], version: -1, placeholder: '' };
const device = /Mobi|Android/i.test(navigator.userAgent) ? 'mobile' : 'desktop';

async function api(path, options = {}) {
  const res = await fetch(path, options);
  const data = await res.json().catch(() => ({}));
  if (!res.ok) throw new Error(data.detail || data.error || res.statusText);
  return data;
}
const post = (path, body) => api(path, { method: 'POST', headers: { 'Content-Type': 'application/json' }, body: JSON.stringify(body) });
const esc = (s) => String(s ?? '').replace(/[&<>"']/g, (c) => ({ '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#39;' }[c]));
const money = (n) => (n == null ? '—' : Number(n).toLocaleString('es-MX', { minimumFractionDigits: 2, maximumFractionDigits: 2 }));

function logInteraction(model, action, extra = {}) {
  if (!state.buyer) return;
  post('/api/interactions', { buyer: state.buyer, model, action, device, ...extra }).catch(() => {});
}

async function loadConfig() {
  const cfg = await api('/api/config');
  state.placeholder = cfg.placeholderImage;
  $('buyer').innerHTML = cfg.buyers.map((b) => `<option>${esc(b)}</option>`).join('');
  state.buyer = localStorage.getItem('buyer') || cfg.buyers[0] || '';
  $('buyer').value = state.buyer;
  $('reload-images').hidden = !cfg.imageSync;
}

async function search() {
  const q = $('q').value.trim();
  const params = new URLSearchParams(q.includes(',') ? { keywords: q } : { q });
  const data = await api('/api/products?' + params);
  state.items = data.items;
  $('status').textContent = `${data.items.length} productos` + (data.items.length >= 200 ? ' (primeros 200)' : '');
  render();
}

function render() {
  const inCart = new Set(state.cart.map((i) => i.model));
  $('grid').innerHTML = state.items.map((p) => {
    const price = p.prices[state.buyer] || {};
    return `<div class="card ${inCart.has(p.model) ? 'in-cart' : ''}" data-model="${esc(p.model)}">
      <img loading="lazy" src="${esc(p.image)}" onerror="this.src='${esc(state.placeholder)}'"/>
      <div class="body">
        <div class="model">${esc(p.model)}</div>
        <div class="short">${esc(p.short)}</div>
        <div class="price">FOB ${money(price.fob)} · PVP ${money(price.pvp)}</div>
        <div style="display:flex; gap:6px">
          <button data-action="detail">Detalle</button>
          <button data-action="toggle" class="${inCart.has(p.model) ? '' : 'primary'}">${inCart.has(p.model) ? 'Quitar' : 'Agregar'}</button>
        </div>
      </div></div>`;
  }).join('');
}

async function refreshCart(force = false) {
  if (!state.buyer) return;
  const v = await api('/api/cart/version?buyer=' + encodeURIComponent(state.buyer));
  if (!force && v.version === state.version) return;
  const data = await api('/api/cart?buyer=' + encodeURIComponent(state.buyer));
  applyCart(data);
}

function applyCart(data) {
  state.cart = data.items;
  state.version = data.version;
  $('count').textContent = data.items.length;
  render();
  if ($('cart-dialog').open) renderCart();
}

function renderCart() {
  $('cart-buyer').textContent = state.buyer;
  const byModel = new Map(state.items.map((p) => [p.model, p]));
  $('cart-rows').innerHTML = state.cart.map((i) => {
    const p = byModel.get(i.model);
    const img = i.image || (p && p.image) || state.placeholder;
    return `<tr data-model="${esc(i.model)}">
      <td><img src="${esc(img)}" onerror="this.src='${esc(state.placeholder)}'"/></td>
      <td>${esc(i.model)}${i.isCustom ? ' <em>(adicional)</em>' : ''}</td>
      <td>${esc(i.short || (p && (p.short || p.name)) || '')}</td>
      <td><textarea data-note>${esc(i.note)}</textarea></td>
      <td><button data-remove>Quitar</button></td></tr>`;
  }).join('');
}

async function toggle(model) {
  const p = state.items.find((x) => x.model === model);
  if (state.cart.some((i) => i.model === model)) {
    applyCart(await post('/api/cart/remove', { buyer: state.buyer, model }));
    logInteraction(model, 'remove');
  } else {
    const price = (p && p.prices[state.buyer]) || {};
    const item = { model, short: p ? p.short : '', image: p ? p.image : '', price: price.fob ?? null, pvp: price.pvp ?? null };
    applyCart(await post('/api/cart/add', { buyer: state.buyer, item }));
    logInteraction(model, 'add', { price: price.fob ?? '' });
  }
}

async function showDetail(model) {
  const p = await api('/api/products/' + encodeURIComponent(model));
  logInteraction(model, 'view');
  $('detail-title').textContent = p.model;
  const rows = p.details.map((d) => `<dt>${esc(d.label)}</dt><dd>${esc(d.value)}</dd>`).join('');
  const extra = Object.entries(p.raw).map(([k, v]) => `<dt>${esc(k)}</dt><dd>${esc(v)}</dd>`).join('');
  $('detail-body').innerHTML = `<img src="${esc(p.image)}" style="max-width:100%;max-height:320px"/>
    <p>${esc(p.name || p.short)}</p><dl>${rows}</dl><details><summary>Todos los campos</summary><dl>${extra}</dl></details>`;
  $('detail-dialog').showModal();
}

function readAsDataUrl(file) {
  return new Promise((resolve, reject) => {
    const reader = new FileReader();
    reader.onload = () => resolve(reader.result);
    reader.onerror = reject;
    reader.readAsDataURL(file);
  });
}

async function pollJob(id) {
  $('job-dialog').showModal();
  for (;;) {
    const job = await api('/api/jobs/' + id);
    $('job-state').textContent = job.state + (job.code != null ? ` (código ${job.code})` : '') + (job.error ? `: ${job.error}` : '');
    $('job-log').textContent = (job.lines || []).map((l) => (l.kind === 'err' ? '! ' : '') + l.line).join('\n');
    if (job.state === 'completed' || job.state === 'failed') break;
    await new Promise((r) => setTimeout(r, 1500));
  }
  search();
}

$('grid').addEventListener('click', (e) => {
  const btn = e.target.closest('button');
  const card = e.target.closest('.card');
  if (!btn || !card) return;
  const model = card.dataset.model;
  if (btn.dataset.action === 'toggle') toggle(model).catch(alert);
  if (btn.dataset.action === 'detail') showDetail(model).catch(alert);
});
$('cart-rows').addEventListener('click', async (e) => {
  const row = e.target.closest('tr');
  if (!row || !e.target.matches('[data-remove]')) return;
  applyCart(await post('/api/cart/remove', { buyer: state.buyer, model: row.dataset.model }));
});
$('cart-rows').addEventListener('change', async (e) => {
  const row = e.target.closest('tr');
  if (!row || !e.target.matches('[data-note]')) return;
  applyCart(await post('/api/cart/add', { buyer: state.buyer, item: { model: row.dataset.model, note: e.target.value } }));
  logInteraction(row.dataset.model, 'note', { note: e.target.value });
});
document.querySelectorAll('[data-close]').forEach((b) => b.addEventListener('click', () => b.closest('dialog').close()));
$('buyer').addEventListener('change', () => {
  state.buyer = $('buyer').value;
  localStorage.setItem('buyer', state.buyer);
  state.version = -1;
  refreshCart(true);
});
let timer;
$('q').addEventListener('input', () => { clearTimeout(timer); timer = setTimeout(() => search().catch(alert), 250); });
$('open-cart').addEventListener('click', () => { renderCart(); $('cart-dialog').showModal(); });
$('clear-cart').addEventListener('click', async () => {
  if (confirm('¿Vaciar la selección?')) applyCart(await post('/api/cart/clear', { buyer: state.buyer }));
});
$('dl-excel').addEventListener('click', () => { location.href = '/api/download_cart_excel?buyer=' + encodeURIComponent(state.buyer); });
$('dl-pdf').addEventListener('click', () => { location.href = '/api/download_cart_pdf?buyer=' + encodeURIComponent(state.buyer); });
$('custom-add').addEventListener('click', async () => {
  const model = $('custom-model').value.trim();
  if (!model) return alert('El nombre del producto es obligatorio.');
  const file = $('custom-image').files[0];
  const item = { model, note: $('custom-note').value, imageBase64: file ? await readAsDataUrl(file) : null };
  try {
    applyCart(await post('/api/cart/add_custom', { buyer: state.buyer, item }));
    $('custom-model').value = ''; $('custom-note').value = ''; $('custom-image').value = '';
  } catch (err) { alert(err.message); }
});
$('reload').addEventListener('click', async () => {
  $('status').textContent = 'Recargando…';
  const r = await api('/api/reload', { method: 'POST' }).catch((err) => ({ error: err.message }));
  if (r.error) alert(r.error);
  search();
});
$('upload-btn').addEventListener('click', () => $('upload').click());
$('upload').addEventListener('change', async () => {
  const file = $('upload').files[0];
  if (!file) return;
  const form = new FormData();
  form.append('file', file);
  try { await api('/api/upload_catalog', { method: 'POST', body: form }); search(); }
  catch (err) { alert(err.message); }
  $('upload').value = '';
});
$('reload-images').addEventListener('click', async () => {
  try { const r = await api('/api/reload_images', { method: 'POST' }); pollJob(r.job_id); }
  catch (err) { alert(err.message); }
});

loadConfig().then(() => Promise.all([search(), refreshCart(true)])).catch((err) => { $('status').textContent = err.message; });
setInterval(() => refreshCart().catch(() => {}), 4000);
</script>
</body>
</html>
"##;
