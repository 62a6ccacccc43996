/// Single-page Leaflet console. Query forms post to `/actions/*`; the map is
/// redrawn from the scene snapshots streamed on `/stream_overlays`.
pub const CONSOLE_HTML: &str = r#"
<!doctype html>
<html lang="en">

<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Spatial Query Console</title>
  <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.css" crossorigin="anonymous"
    referrerpolicy="no-referrer" />
  <script src="https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.js" crossorigin="anonymous"
    referrerpolicy="no-referrer"></script>
  <style>
    html, body { height: 100%; margin: 0; font-family: ui-sans-serif, system-ui, sans-serif; }
    body { display: flex; }
    #panel { width: 320px; padding: 16px; box-sizing: border-box; background: #0f172a; color: #e2e8f0; overflow-y: auto; }
    #panel h2 { font-size: 15px; margin: 18px 0 6px; }
    #panel input { width: 100%; box-sizing: border-box; margin: 3px 0; padding: 6px; border-radius: 4px; border: 1px solid #334155; background: #1e293b; color: #e2e8f0; }
    #panel button { margin-top: 4px; padding: 6px 10px; border: 0; border-radius: 4px; background: #38bdf8; color: #0f172a; font-weight: 600; cursor: pointer; }
    #status { margin-top: 18px; font-size: 13px; min-height: 1.2em; }
    #status.error { color: #fb7185; }
    #map { flex: 1; }
    .custom-marker div { width: 12px; height: 12px; border-radius: 50%; border: 2px solid white; box-shadow: 0 0 3px rgba(0, 0, 0, 0.5); }
  </style>
</head>

<body>
  <div id="panel">
    <p>Click the map to add a point.</p>

    <h2>Nearest neighbor</h2>
    <input id="nearest-point" placeholder="Latitude, Longitude" />
    <button id="nearest-run">Find nearest</button>

    <h2>Range query</h2>
    <input id="range-point" placeholder="Latitude, Longitude" />
    <input id="range-radius" placeholder="Radius (km)" />
    <button id="range-run">Search range</button>

    <h2>Intersection</h2>
    <input id="intersection-point" placeholder="lat, lng; lat, lng; lat, lng" />
    <button id="intersection-run">Detect intersections</button>

    <div id="status"></div>
  </div>
  <div id="map"></div>

  <script>
    const map = L.map('map').setView([26.4753, 73.1173], 13);
    L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
      attribution: '&copy; OpenStreetMap contributors'
    }).addTo(map);

    const drawn = new Map();
    let lastFit = 0;

    function markerIcon(style) {
      if (style.color === 'default') return new L.Icon.Default();
      return L.divIcon({
        className: 'custom-marker',
        html: `<div style="background-color: ${style.color}"></div>`,
        iconSize: [12, 12],
        iconAnchor: [6, 6]
      });
    }

    function regionOptions(style) {
      return { color: style.stroke, fillColor: style.fill, fillOpacity: style.fill_opacity };
    }

    function buildLayer(layer) {
      switch (layer.type) {
        case 'marker': {
          const marker = L.marker([layer.point.lat, layer.point.lng], { icon: markerIcon(layer.style) });
          if (layer.style.label) marker.bindPopup(layer.style.label);
          return marker;
        }
        case 'circle':
          return L.circle([layer.center.lat, layer.center.lng], { radius: layer.radius_m, ...regionOptions(layer.style) });
        case 'polygon':
          return L.polygon(layer.vertices.map(v => [v.lat, v.lng]), regionOptions(layer.style));
      }
      return null;
    }

    function applyScene(scene) {
      const live = new Set(scene.layers.map(layer => layer.id));
      for (const [id, layer] of drawn) {
        if (!live.has(id)) { map.removeLayer(layer); drawn.delete(id); }
      }
      for (const layer of scene.layers) {
        if (drawn.has(layer.id)) continue;
        const built = buildLayer(layer);
        if (built) { built.addTo(map); drawn.set(layer.id, built); }
      }
      const viewport = scene.viewport;
      if (viewport && viewport.seq !== lastFit) {
        lastFit = viewport.seq;
        const b = viewport.bounds;
        map.fitBounds([[b.min_lat, b.min_lng], [b.max_lat, b.max_lng]], {
          padding: [viewport.padding_px, viewport.padding_px]
        });
      }
    }

    function setStatus(text, isError) {
      const status = document.getElementById('status');
      status.textContent = text;
      status.className = isError ? 'error' : '';
    }

    async function post(path, body) {
      try {
        const response = await fetch(path, {
          method: 'POST',
          headers: { 'Content-Type': 'application/json' },
          body: JSON.stringify(body)
        });
        const result = await response.json();
        if (!result.ok) {
          setStatus(result.message, true);
          alert(result.message);
          return;
        }
        const outcome = result.outcome;
        if (!outcome) setStatus('Point added', false);
        else if (outcome.status === 'rendered') setStatus(`${outcome.results} result(s)`, false);
        else setStatus('Superseded by a newer query', false);
      } catch (error) {
        setStatus('Console unreachable', true);
      }
    }

    function value(id) { return document.getElementById(id).value; }

    map.on('click', e => post('/actions/point', { lat: e.latlng.lat, lng: e.latlng.lng }));
    document.getElementById('nearest-run').onclick = () =>
      post('/actions/nearest', { location: value('nearest-point') });
    document.getElementById('range-run').onclick = () =>
      post('/actions/range', { center: value('range-point'), radius_km: value('range-radius') });
    document.getElementById('intersection-run').onclick = () =>
      post('/actions/intersection', { area: value('intersection-point') });

    const events = new EventSource('/stream_overlays');
    events.onmessage = event => applyScene(JSON.parse(event.data));
  </script>
</body>

</html>
"#;
