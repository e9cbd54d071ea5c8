//! The shell probe bundle executed on every host.
//!
//! Each probe prints exactly one `KEY:value` line. All probes are joined into
//! a single command so one SSH round trip collects everything.

pub const CPU: &str = "CPU";
pub const TEMPERATURE: &str = "TMP";
pub const MEMORY: &str = "MEM";
pub const SWAP: &str = "SWP";
pub const DISK: &str = "DSK";
pub const NETWORK: &str = "NET";
pub const LOAD: &str = "LOD";
pub const OS: &str = "OS";
pub const UPTIME: &str = "UPT";

const PROBES: &[&str] = &[
    // busy percentage of the first `top` sample
    "echo CPU:$(top -bn1 | grep 'Cpu(s)' | awk '{print $2}' | head -n 1)",
    // millidegrees
    "echo TMP:$(cat /sys/class/thermal/thermal_zone0/temp 2>/dev/null || echo 0)",
    // total used, MB
    "echo MEM:$(free -m | awk '/Mem:/ {print $2 \" \" $3}')",
    "echo SWP:$(free -m | awk '/Swap:/ {print $2 \" \" $3}')",
    "echo DSK:$(df -m / | tail -1 | awk '{print $2 \" \" $3}')",
    // cumulative rx tx bytes over every interface but loopback
    "echo NET:$(awk 'NR>2 {sub(/:/, \" \"); if ($1 != \"lo\") {rx+=$2; tx+=$10}} END {printf \"%.0f %.0f\", rx, tx}' /proc/net/dev)",
    "echo LOD:$(awk '{print $1}' /proc/loadavg)",
    "echo OS:$(grep 'PRETTY_NAME' /etc/os-release | cut -d'\"' -f2 | head -n 1)",
    "echo UPT:$(uptime -p)",
];

/// The full probe command line.
pub fn bundle() -> String {
    PROBES.join("; ")
}
