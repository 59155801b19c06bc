//! Embedded control panel page.

use axum::response::Html;

pub const CONTROL_PANEL: &str = r##"<!DOCTYPE html>
<html>
<head>
    <title>Robot Control</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
        body { font-family: Arial, sans-serif; text-align: center; margin: 0; padding: 20px; }
        .control-panel {
            max-width: 500px;
            margin: 0 auto;
            padding: 20px;
            border: 1px solid #ccc;
            border-radius: 10px;
            background: #f9f9f9;
        }
        .direction-controls {
            display: grid;
            grid-template-columns: 1fr 1fr 1fr;
            grid-template-rows: 1fr 1fr 1fr;
            gap: 10px;
            margin-bottom: 20px;
        }
        .control-btn {
            padding: 20px;
            font-size: 18px;
            border-radius: 5px;
            border: 1px solid #ddd;
            background: #fff;
            cursor: pointer;
        }
        .control-btn:active { background: #eee; }
        .speed-control { margin-bottom: 20px; }
        .response {
            min-height: 50px;
            border: 1px solid #ddd;
            padding: 10px;
            margin-top: 20px;
            text-align: left;
            white-space: pre-wrap;
            background: #fff;
        }
        .status { padding: 5px; border-radius: 5px; display: inline-block; margin-bottom: 10px; }
        .connected { background: #d4edda; color: #155724; }
        .disconnected { background: #f8d7da; color: #721c24; }
        .telemetry-info {
            margin-top: 20px;
            padding: 10px;
            background: #e9ecef;
            border-radius: 5px;
            text-align: left;
            font-size: 14px;
        }
    </style>
</head>
<body>
    <h1>Robot Control Panel</h1>

    <div class="control-panel">
        <div id="statusIndicator" class="status disconnected">Disconnected</div>

        <div class="direction-controls">
            <button class="control-btn" style="grid-column: 1; grid-row: 1;" onclick="sendCommand('L')">&#8598;</button>
            <button class="control-btn" style="grid-column: 2; grid-row: 1;" onclick="sendCommand('F')">&#8593;</button>
            <button class="control-btn" style="grid-column: 3; grid-row: 1;" onclick="sendCommand('R')">&#8599;</button>

            <button class="control-btn" style="grid-column: 1; grid-row: 2;" onclick="sendCommand('L')">&#8592;</button>
            <button class="control-btn" style="grid-column: 2; grid-row: 2;" onclick="sendCommand('S')">&#9632;</button>
            <button class="control-btn" style="grid-column: 3; grid-row: 2;" onclick="sendCommand('R')">&#8594;</button>

            <button class="control-btn" style="grid-column: 1; grid-row: 3;" onclick="sendCommand('L')">&#8601;</button>
            <button class="control-btn" style="grid-column: 2; grid-row: 3;" onclick="sendCommand('B')">&#8595;</button>
            <button class="control-btn" style="grid-column: 3; grid-row: 3;" onclick="sendCommand('R')">&#8600;</button>
        </div>

        <div class="speed-control">
            <label for="speedSlider">Speed: <span id="speedValue">128</span></label>
            <input type="range" id="speedSlider" min="0" max="255" value="128" oninput="updateSpeed(this.value)">
        </div>

        <div class="response" id="responseArea">Response will appear here...</div>

        <div class="telemetry-info" id="telemetryInfo">
            Telemetry logging active. <a href="#" id="telemetryLink" target="_blank">View channel</a>
            <div><button onclick="forceTelemetryUpdate()">Force Telemetry Update</button></div>
        </div>
    </div>

    <script>
        let currentSpeed = 128;

        function updateSpeed(speed) {
            currentSpeed = speed;
            document.getElementById('speedValue').textContent = speed;
        }

        function sendCommand(direction) {
            const command = direction + currentSpeed;
            fetch('/api/command', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ command: command }),
            })
            .then(response => response.json())
            .then(data => {
                document.getElementById('responseArea').textContent =
                    `Command: ${command}\nResponse: ${JSON.stringify(data)}`;
            })
            .catch(error => {
                document.getElementById('responseArea').textContent = `Error: ${error}`;
            });
        }

        function forceTelemetryUpdate() {
            fetch('/api/thingspeak/update')
                .then(response => response.json())
                .then(data => alert(data.message))
                .catch(error => alert('Error updating telemetry: ' + error));
        }

        function loadTelemetryInfo() {
            fetch('/api/thingspeak/info')
                .then(response => response.json())
                .then(data => {
                    document.getElementById('telemetryLink').href = data.thingspeak_url;
                })
                .catch(error => console.error('Error getting telemetry info:', error));
        }

        function checkStatus() {
            const statusElement = document.getElementById('statusIndicator');
            fetch('/api/status')
            .then(response => response.json())
            .then(data => {
                if (data.status === 'connected') {
                    statusElement.textContent = 'Connected';
                    statusElement.className = 'status connected';
                } else {
                    statusElement.textContent = data.status === 'demo' ? 'Demo Mode' : 'Disconnected';
                    statusElement.className = 'status disconnected';
                }
            })
            .catch(() => {
                statusElement.textContent = 'Disconnected';
                statusElement.className = 'status disconnected';
            });
        }

        checkStatus();
        setInterval(checkStatus, 5000);
        loadTelemetryInfo();

        document.addEventListener('keydown', function(event) {
            switch (event.key) {
                case 'ArrowUp': sendCommand('F'); break;
                case 'ArrowDown': sendCommand('B'); break;
                case 'ArrowLeft': sendCommand('L'); break;
                case 'ArrowRight': sendCommand('R'); break;
                case ' ': sendCommand('S'); break;
            }
        });
    </script>
</body>
</html>
"##;

pub async fn control_panel() -> Html<&'static str> {
    Html(CONTROL_PANEL)
}
